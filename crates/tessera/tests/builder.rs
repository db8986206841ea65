//! Integration tests for the `Tessera` builder.

use std::sync::Arc;
use std::time::Duration;

use chrono::TimeDelta;
use tessera::prelude::*;
use tessera::protocol::RefreshRequest;
use tessera::store::{KEY_EXPIRES_AT, KEY_REFRESH_TOKEN, KEY_ROLES, KEY_TOKEN};

// =========================================================================
// Helpers
// =========================================================================

/// Always hands out the same token set, valid for an hour.
struct FixedTransport {
    clock: MonotonicClock,
}

impl FixedTransport {
    fn response(&self) -> LoginResponse {
        LoginResponse {
            access_token: "T1".into(),
            refresh_token: "R1".into(),
            expires_at: self.clock.now() + TimeDelta::hours(1),
            roles: vec![OWNER_ROLE.into()],
            user: UserIdentity {
                id: "123".into(),
                user_name: "u".into(),
                email: "u@x.com".into(),
                display_name: "U".into(),
            },
        }
    }
}

impl AuthTransport for FixedTransport {
    async fn login(&self, _: &Credentials) -> Result<LoginResponse, TransportError> {
        Ok(self.response())
    }

    async fn refresh(&self, _: &RefreshRequest) -> Result<LoginResponse, TransportError> {
        Ok(self.response())
    }
}

fn transport(clock: MonotonicClock) -> FixedTransport {
    FixedTransport { clock }
}

// =========================================================================
// Without persistence
// =========================================================================

#[tokio::test]
async fn test_build_without_store_starts_logged_out() {
    let clock = MonotonicClock::new();
    let session = Tessera::builder()
        .clock(Arc::new(clock))
        .build(transport(clock))
        .unwrap();

    assert_eq!(session.phase(), SessionPhase::LoggedOut);
    assert!(!session.is_refresh_scheduled());
}

#[tokio::test]
async fn test_build_applies_config() {
    let clock = MonotonicClock::new();
    let session = Tessera::builder()
        .config(SessionConfig::with_refresh_threshold(Duration::from_secs(30)))
        .clock(Arc::new(clock))
        .build(transport(clock))
        .unwrap();

    assert_eq!(session.config().refresh_threshold, Duration::from_secs(30));
}

#[tokio::test]
async fn test_session_errors_convert_into_tessera_error() {
    async fn refresh(session: &SessionManager<FixedTransport>) -> Result<(), TesseraError> {
        session.refresh_token().await?;
        Ok(())
    }

    let clock = MonotonicClock::new();
    let session = Tessera::builder().build(transport(clock)).unwrap();

    let err = refresh(&session).await.unwrap_err();
    assert!(matches!(
        err,
        TesseraError::Session(SessionError::NoRefreshToken)
    ));
}

// =========================================================================
// With persistence
// =========================================================================

#[tokio::test]
async fn test_build_restores_saved_session() {
    let clock = MonotonicClock::new();
    let store = Arc::new(MemoryStore::new());
    let expires_at = clock.now() + TimeDelta::hours(1);
    store.set(KEY_TOKEN, "T7").unwrap();
    store.set(KEY_REFRESH_TOKEN, "R7").unwrap();
    store.set(KEY_EXPIRES_AT, &expires_at.to_rfc3339()).unwrap();
    store.set(KEY_ROLES, r#"["Proprietario"]"#).unwrap();

    let session = Tessera::builder()
        .clock(Arc::new(clock))
        .store(store)
        .build(transport(clock))
        .unwrap();

    assert_eq!(session.token().as_deref(), Some("T7"));
    assert!(session.is_authenticated());
    assert!(session.is_owner());
    assert!(session.is_refresh_scheduled());
}

#[tokio::test]
async fn test_build_with_store_writes_login_through() {
    let clock = MonotonicClock::new();
    let store = Arc::new(MemoryStore::new());
    let session = Tessera::builder()
        .clock(Arc::new(clock))
        .store(Arc::clone(&store) as Arc<dyn KeyValueStore>)
        .build(transport(clock))
        .unwrap();

    session.login(Credentials::new("u", "p")).await.unwrap();

    tokio::time::timeout(Duration::from_secs(1), async {
        while store.get(KEY_TOKEN).unwrap().is_none() {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("login should be persisted");
    assert_eq!(store.get(KEY_REFRESH_TOKEN).unwrap().as_deref(), Some("R1"));
}

#[tokio::test]
async fn test_build_with_file_store_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("session.json");
    let clock = MonotonicClock::new();

    {
        let store = Arc::new(FileStore::open(&path).unwrap());
        let session = Tessera::builder()
            .clock(Arc::new(clock))
            .store(Arc::clone(&store) as Arc<dyn KeyValueStore>)
            .build(transport(clock))
            .unwrap();
        session.login(Credentials::new("u", "p")).await.unwrap();

        tokio::time::timeout(Duration::from_secs(1), async {
            while store.get(KEY_TOKEN).unwrap().is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("login should be persisted");
    }

    let session = Tessera::builder()
        .clock(Arc::new(clock))
        .store(Arc::new(FileStore::open(&path).unwrap()))
        .build(transport(clock))
        .unwrap();

    assert_eq!(session.token().as_deref(), Some("T1"));
    assert!(session.is_authenticated());
}

// =========================================================================
// HTTP
// =========================================================================

#[cfg(feature = "http")]
#[tokio::test]
async fn test_build_http_rejects_invalid_base_url() {
    let result = Tessera::builder().build_http(HttpTransportConfig {
        base_url: "localhost:5000".into(),
        ..HttpTransportConfig::default()
    });

    assert!(matches!(
        result,
        Err(TesseraError::Transport(TransportError::InvalidConfig(_)))
    ));
}
