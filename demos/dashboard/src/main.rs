use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::TimeDelta;
use clap::Parser;
use tessera::prelude::*;
use tessera::protocol::RefreshRequest;

// ---------------------------------------------------------------------------
// Scripted auth server
// ---------------------------------------------------------------------------

/// An in-process stand-in for the auth API.
///
/// Accepts any username with the password `secret` and hands out
/// numbered tokens that live for `lifetime`, so the proactive refresh
/// kicks in within seconds instead of an hour.
struct ScriptedAuth {
    clock: Arc<dyn Clock>,
    lifetime: TimeDelta,
    issued: AtomicUsize,
}

impl ScriptedAuth {
    fn new(clock: Arc<dyn Clock>, lifetime: TimeDelta) -> Self {
        Self {
            clock,
            lifetime,
            issued: AtomicUsize::new(0),
        }
    }

    fn issued(&self) -> usize {
        self.issued.load(Ordering::SeqCst)
    }

    fn issue(&self, username: &str) -> LoginResponse {
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        LoginResponse {
            access_token: format!("access-{n}"),
            refresh_token: format!("refresh-{n}"),
            expires_at: self.clock.now() + self.lifetime,
            roles: vec![OWNER_ROLE.into(), "Gerente".into()],
            user: UserIdentity {
                id: "1".into(),
                user_name: username.into(),
                email: format!("{username}@example.com"),
                display_name: username.to_uppercase(),
            },
        }
    }
}

impl AuthTransport for ScriptedAuth {
    async fn login(&self, credentials: &Credentials) -> Result<LoginResponse, TransportError> {
        if credentials.password != "secret" {
            return Err(TransportError::Unauthorized);
        }
        Ok(self.issue(&credentials.username))
    }

    async fn refresh(&self, request: &RefreshRequest) -> Result<LoginResponse, TransportError> {
        if !request.refresh_token.starts_with("refresh-") {
            return Err(TransportError::Unauthorized);
        }
        Ok(self.issue("demo"))
    }
}

// ---------------------------------------------------------------------------
// Command line
// ---------------------------------------------------------------------------

#[derive(Debug, Parser)]
#[command(name = "dashboard")]
#[command(about = "Log in, watch the session refresh itself, log out")]
struct Args {
    /// Talk to a real auth API at this base URL instead of the script
    #[arg(long, value_name = "BASE_URL")]
    http: Option<String>,

    /// Username to log in with
    #[arg(long = "user", default_value = "demo")]
    username: String,

    /// Password to log in with
    #[arg(long, default_value = "secret")]
    password: String,

    /// Seconds to sit and watch automatic refreshes
    #[arg(long = "watch", value_name = "SECS", default_value_t = 10)]
    watch_secs: u64,
}

impl Args {
    fn watch(&self) -> Duration {
        Duration::from_secs(self.watch_secs)
    }
}

// ---------------------------------------------------------------------------
// Dashboard
// ---------------------------------------------------------------------------

/// One line describing the session. Never prints token values.
fn describe(state: &SessionState) -> String {
    if !state.is_logged_in() {
        return if state.is_loading {
            "logged out (signing in...)".into()
        } else {
            "logged out".into()
        };
    }
    let who = state.user.as_ref().map_or("?", |u| u.user_name.as_str());
    let expires = state
        .expires_at
        .map_or("unknown".to_string(), |t| t.format("%H:%M:%S").to_string());
    let loading = if state.is_loading {
        " (refreshing...)"
    } else {
        ""
    };
    format!(
        "{who} [{}] token expires {expires}{loading}",
        state.roles.join(", ")
    )
}

/// Logs in, watches the session refresh itself, refreshes once by hand,
/// then logs out. Every state change is printed as it happens.
async fn run<T: AuthTransport>(
    session: SessionManager<T>,
    args: &Args,
) -> Result<(), TesseraError> {
    let mut changes = session.subscribe();
    let printer = tokio::spawn(async move {
        while changes.changed().await.is_ok() {
            println!("  state: {}", describe(&changes.borrow_and_update()));
        }
    });

    println!("logging in as {}", args.username);
    session
        .login(Credentials::new(args.username.clone(), args.password.clone()))
        .await?;
    println!(
        "logged in: owner={} remaining={}s phase={:?}",
        session.is_owner(),
        session.token_time_remaining().as_secs(),
        session.phase()
    );

    println!("watching automatic refreshes for {}s", args.watch_secs);
    tokio::time::sleep(args.watch()).await;

    println!("refreshing explicitly");
    session.refresh_token().await?;
    println!(
        "refreshed: remaining={}s",
        session.token_time_remaining().as_secs()
    );

    session.logout();
    println!("logged out: authenticated={}", session.is_authenticated());

    drop(session);
    let _ = printer.await;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), TesseraError> {
    tessera::init_tracing();

    let args = Args::parse();

    match &args.http {
        Some(base_url) => {
            let session = Tessera::builder()
                .config(SessionConfig::from_env())
                .build_http(HttpTransportConfig {
                    base_url: base_url.clone(),
                    ..HttpTransportConfig::from_env()
                })?;
            run(session, &args).await
        }
        None => {
            // Eight-second tokens refreshed five seconds early: a refresh
            // roughly every three seconds.
            let clock: Arc<dyn Clock> = Arc::new(SystemClock);
            let session = Tessera::builder()
                .config(SessionConfig::with_refresh_threshold(Duration::from_secs(5)))
                .clock(Arc::clone(&clock))
                .build(ScriptedAuth::new(clock, TimeDelta::seconds(8)))?;
            run(session, &args).await
        }
    }
}
