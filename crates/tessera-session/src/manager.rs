//! The session manager: owns the token set and keeps it fresh.
//!
//! This is the central piece of the session layer. It's responsible for:
//! - Logging in and storing the resulting token set
//! - Refreshing the access token, with concurrent requests coalesced
//!   into a single network call
//! - Scheduling a proactive refresh shortly before the token expires
//! - Telling an explicit refresh failure (session is over) apart from an
//!   automatic refresh failure (try again later)
//! - Answering "am I logged in / which roles do I have?" synchronously
//!
//! # Concurrency model
//!
//! `SessionManager` is a cheap-to-clone handle around an `Arc`. All
//! clones see the same session. Internally there are two pieces of
//! shared state:
//!
//! - a `tokio::sync::watch` channel holding the [`SessionState`]. Readers
//!   borrow it synchronously; UI layers [`subscribe`](SessionManager::subscribe)
//!   to it.
//! - a `std::sync::Mutex<Control>` holding the in-flight call (if any)
//!   and an *epoch* counter. The lock is never held across an `.await`,
//!   and every write to the session state happens while holding it, so
//!   state transitions are serialized.
//!
//! The network call itself runs on its own Tokio task and is exposed to
//! callers as a `Shared` future: the first caller starts it, later
//! callers clone and await the same future, and the call finishes even if
//! every caller gives up waiting.
//!
//! # Epochs
//!
//! Every login, logout and restore bumps the epoch. A call remembers the
//! epoch it started in and only writes its result back if the epoch is
//! unchanged. That's what stops a refresh that was in flight during a
//! logout from logging the user back in when it completes.
//!
//! # Failed refreshes
//!
//! The decision to end the session is taken in the same critical section
//! that retires the failed call. An explicit caller marks the flight it
//! starts or joins; when that flight fails it logs the session out before
//! the slot is released. A caller that wakes up late never acts on the
//! session afterwards, so it can't wipe one that was renewed meanwhile.

use std::fmt;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::TimeDelta;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tessera_clock::{Clock, DelayedTask, SystemClock};
use tessera_protocol::{Credentials, LoginResponse, RefreshRequest, UserIdentity};
use tessera_transport::{AuthTransport, TransportError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::{OWNER_ROLE, SessionConfig, SessionError, SessionPhase, SessionState};

/// The outcome of one login/refresh call, shareable between all callers.
type Flight = Shared<BoxFuture<'static, Result<LoginResponse, SessionError>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlightKind {
    Login,
    Refresh,
}

struct InFlight {
    kind: FlightKind,
    epoch: u64,
    /// Set once any caller of `refresh_token` waits on this call. A
    /// failure then ends the session.
    explicit: bool,
    result: Flight,
}

struct Control {
    /// The outstanding login/refresh call. At most one at a time.
    in_flight: Option<InFlight>,
    /// Bumped by login, logout and restore.
    epoch: u64,
}

struct Inner<T> {
    transport: T,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: watch::Sender<SessionState>,
    control: Mutex<Control>,
    /// The proactive refresh timer. At most one pending callback.
    timer: DelayedTask,
}

/// Manages the authenticated session of one client.
///
/// ## Lifecycle
///
/// ```text
/// login() ──→ [LoggedIn] ──(threshold reached)──→ automatic refresh
///                 │  ▲                                   │
///                 │  └────────── ok (or failed: keep) ───┘
///                 │
///   logout() or explicit refresh_token() failure
///                 │
///                 ▼
///            [LoggedOut]
/// ```
///
/// Must be used from within a Tokio runtime: login/refresh calls and the
/// refresh timer run as Tokio tasks.
pub struct SessionManager<T: AuthTransport> {
    inner: Arc<Inner<T>>,
}

impl<T: AuthTransport> Clone for SessionManager<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: AuthTransport> SessionManager<T> {
    /// Creates a logged-out manager that reads time from the system clock.
    pub fn new(config: SessionConfig, transport: T) -> Self {
        Self::with_clock(config, transport, Arc::new(SystemClock))
    }

    /// Creates a logged-out manager with an explicit time source.
    pub fn with_clock(config: SessionConfig, transport: T, clock: Arc<dyn Clock>) -> Self {
        let (state, _) = watch::channel(SessionState::default());
        Self {
            inner: Arc::new(Inner {
                transport,
                clock,
                config,
                state,
                control: Mutex::new(Control {
                    in_flight: None,
                    epoch: 0,
                }),
                timer: DelayedTask::new(),
            }),
        }
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Logs in with a username and password.
    ///
    /// On success the session holds the new token set and the proactive
    /// refresh is scheduled. On failure the session is left exactly as it
    /// was (apart from `is_loading` going back to `false`).
    ///
    /// # Errors
    /// - [`SessionError::Busy`] if a login or refresh is already running.
    ///   Nothing is sent in that case.
    /// - [`SessionError::Transport`] with the transport's error.
    pub async fn login(&self, credentials: Credentials) -> Result<LoginResponse, SessionError> {
        let flight = {
            let mut control = self.inner.lock_control();
            if let Some(current) = &control.in_flight {
                warn!(kind = ?current.kind, "login rejected while another auth call is running");
                return Err(SessionError::Busy);
            }

            control.epoch += 1;
            let epoch = control.epoch;
            self.inner.state.send_modify(|state| state.is_loading = true);
            info!(username = %credentials.username, "logging in");

            let inner = Arc::clone(&self.inner);
            let flight = self.inner.spawn_flight(FlightKind::Login, epoch, async move {
                let result = inner.transport.login(&credentials).await;
                inner.complete(FlightKind::Login, epoch, result)
            });
            control.in_flight = Some(InFlight {
                kind: FlightKind::Login,
                epoch,
                explicit: false,
                result: flight.clone(),
            });
            flight
        };

        flight.await
    }

    /// Clears the session and cancels the scheduled refresh.
    ///
    /// Idempotent. A login/refresh that is still running when this is
    /// called finishes in the background, but its result is discarded.
    pub fn logout(&self) {
        let mut control = self.inner.lock_control();
        self.inner.logout_locked(&mut control);
    }

    /// Exchanges the current token pair for a new one.
    ///
    /// If a refresh is already running (started by another caller or by
    /// the proactive timer), this waits for it and returns its result
    /// instead of sending a second request.
    ///
    /// A failed explicit refresh **ends the session**: the caller is told
    /// the error and the manager logs out, once, no matter how many callers
    /// were waiting on the same call. The logout happens when the call
    /// fails, even if the caller stopped waiting.
    ///
    /// # Errors
    /// - [`SessionError::NoRefreshToken`] if no access or refresh token is
    ///   held. Nothing is sent and the session is not touched.
    /// - [`SessionError::Busy`] if a login is running on top of a held
    ///   token pair.
    /// - [`SessionError::Transport`] with the transport's error.
    pub async fn refresh_token(&self) -> Result<LoginResponse, SessionError> {
        let flight = self.inner.start_or_join_refresh(true)?;
        flight.await
    }

    /// Replaces the session with a previously saved one (persistence).
    ///
    /// The state is normalized first (`is_loading` cleared, half-empty
    /// states emptied). Any running call is abandoned, like on logout, and
    /// the proactive refresh is rescheduled for the restored token.
    pub fn restore(&self, state: SessionState) {
        let mut control = self.inner.lock_control();
        control.epoch += 1;
        control.in_flight = None;

        let state = state.normalized();
        let logged_in = state.is_logged_in();
        self.inner.state.send_replace(state);
        info!(logged_in, "session restored");

        self.inner.schedule_automatic_refresh();
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    /// The current access token, if logged in. May be expired.
    pub fn token(&self) -> Option<String> {
        self.inner.state.borrow().access_token.clone()
    }

    /// `true` if a refresh token is held.
    pub fn has_refresh_token(&self) -> bool {
        self.inner.state.borrow().refresh_token.is_some()
    }

    /// The logged-in user's profile.
    pub fn user(&self) -> Option<UserIdentity> {
        self.inner.state.borrow().user.clone()
    }

    /// The logged-in user's id.
    pub fn user_id(&self) -> Option<String> {
        self.inner.state.borrow().user.as_ref().map(|user| user.id.clone())
    }

    /// The roles granted to the user, without duplicates.
    pub fn roles(&self) -> Vec<String> {
        self.inner.state.borrow().roles.clone()
    }

    /// `true` if the user holds `role` (exact, case-sensitive).
    pub fn has_role(&self, role: &str) -> bool {
        self.inner.state.borrow().has_role(role)
    }

    /// `true` if the user holds the [`OWNER_ROLE`].
    pub fn is_owner(&self) -> bool {
        self.has_role(OWNER_ROLE)
    }

    /// `true` while a login or refresh call is outstanding.
    pub fn is_loading(&self) -> bool {
        self.inner.state.borrow().is_loading
    }

    /// `true` iff a token is held and it hasn't expired yet.
    pub fn is_authenticated(&self) -> bool {
        let state = self.inner.state.borrow();
        state.is_logged_in() && !state.is_expired_at(self.inner.clock.now())
    }

    /// `true` if the token has expired. Fails closed: no known expiry
    /// counts as expired.
    pub fn is_token_expired(&self) -> bool {
        self.inner.state.borrow().is_expired_at(self.inner.clock.now())
    }

    /// `true` when the token expires within the refresh threshold.
    pub fn should_refresh_token(&self) -> bool {
        self.inner
            .state
            .borrow()
            .should_refresh_at(self.inner.clock.now(), self.inner.config.threshold_delta())
    }

    /// Time until the token expires. Never negative; zero when no expiry
    /// is known.
    pub fn token_time_remaining(&self) -> Duration {
        self.inner
            .state
            .borrow()
            .time_remaining_at(self.inner.clock.now())
    }

    /// Where the session currently is in its lifecycle.
    pub fn phase(&self) -> SessionPhase {
        let refreshing = self
            .inner
            .lock_control()
            .in_flight
            .as_ref()
            .is_some_and(|flight| flight.kind == FlightKind::Refresh);
        if refreshing {
            return SessionPhase::RefreshInFlight;
        }

        let now = self.inner.clock.now();
        let threshold = self.inner.config.threshold_delta();
        let state = self.inner.state.borrow();
        if !state.is_logged_in() {
            SessionPhase::LoggedOut
        } else if state.expires_at.is_none() || state.should_refresh_at(now, threshold) {
            SessionPhase::ExpiringSoon
        } else {
            SessionPhase::LoggedIn
        }
    }

    /// A copy of the whole session record.
    pub fn snapshot(&self) -> SessionState {
        self.inner.state.borrow().clone()
    }

    /// A receiver that sees every session change.
    ///
    /// `watch` semantics: a slow reader sees the latest state, not every
    /// intermediate one.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.inner.state.subscribe()
    }

    /// `true` if a proactive refresh is currently scheduled.
    pub fn is_refresh_scheduled(&self) -> bool {
        self.inner.timer.is_pending()
    }

    /// The configuration this manager was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.inner.config
    }
}

impl<T: AuthTransport> fmt::Debug for SessionManager<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.inner.state.borrow())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Internals
// ---------------------------------------------------------------------------

impl<T: AuthTransport> Inner<T> {
    fn lock_control(&self) -> MutexGuard<'_, Control> {
        self.control.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Runs `call` on its own task and wraps its outcome as a shared
    /// future. A call whose task dies is reported as
    /// [`SessionError::Interrupted`] and releases the in-flight slot.
    fn spawn_flight<F>(self: &Arc<Self>, kind: FlightKind, epoch: u64, call: F) -> Flight
    where
        F: Future<Output = Result<LoginResponse, SessionError>> + Send + 'static,
    {
        let handle = tokio::spawn(call);
        let inner = Arc::clone(self);
        async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    warn!(?kind, error = %join_err, "auth call task died");
                    inner.abandon(kind, epoch);
                    Err(SessionError::Interrupted(join_err.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }

    /// Starts a refresh, or joins the one already running.
    ///
    /// `explicit` marks the flight as one whose failure ends the session.
    fn start_or_join_refresh(self: &Arc<Self>, explicit: bool) -> Result<Flight, SessionError> {
        let mut control = self.lock_control();

        let request = {
            let state = self.state.borrow();
            match (&state.access_token, &state.refresh_token) {
                (Some(access_token), Some(refresh_token)) => RefreshRequest {
                    access_token: access_token.clone(),
                    refresh_token: refresh_token.clone(),
                },
                _ => return Err(SessionError::NoRefreshToken),
            }
        };

        if let Some(current) = &mut control.in_flight {
            return match current.kind {
                FlightKind::Refresh => {
                    debug!(explicit, "joining in-flight token refresh");
                    current.explicit |= explicit;
                    Ok(current.result.clone())
                }
                FlightKind::Login => Err(SessionError::Busy),
            };
        }

        let epoch = control.epoch;
        self.state.send_modify(|state| state.is_loading = true);
        debug!("refreshing access token");

        let inner = Arc::clone(self);
        let flight = self.spawn_flight(FlightKind::Refresh, epoch, async move {
            let result = inner.transport.refresh(&request).await;
            inner.complete(FlightKind::Refresh, epoch, result)
        });
        control.in_flight = Some(InFlight {
            kind: FlightKind::Refresh,
            epoch,
            explicit,
            result: flight.clone(),
        });
        Ok(flight)
    }

    /// Writes a finished call's result back, unless the session moved on
    /// (logout, restore or a newer login) while it was running.
    ///
    /// A failed refresh that an explicit caller waited on logs out here,
    /// under the same lock that retires the flight.
    fn complete(
        self: &Arc<Self>,
        kind: FlightKind,
        epoch: u64,
        result: Result<LoginResponse, TransportError>,
    ) -> Result<LoginResponse, SessionError> {
        let mut control = self.lock_control();

        if control.epoch != epoch {
            debug!(?kind, "discarding result of superseded auth call");
            return result.map_err(SessionError::from);
        }
        let explicit = control
            .in_flight
            .take()
            .is_some_and(|flight| flight.kind == FlightKind::Refresh && flight.explicit);

        match result {
            Ok(response) => {
                let state = SessionState::from_response(&response);
                info!(
                    ?kind,
                    user_id = %response.user.id,
                    expires_at = %response.expires_at,
                    roles = state.roles.len(),
                    "session updated"
                );
                self.state.send_replace(state);
                self.schedule_automatic_refresh();
                Ok(response)
            }
            Err(err) if explicit => {
                warn!(error = %err, "token refresh failed, session ended");
                self.logout_locked(&mut control);
                Err(SessionError::from(err))
            }
            Err(err) => {
                self.state.send_modify(|state| state.is_loading = false);
                warn!(?kind, error = %err, "auth call failed");
                Err(SessionError::from(err))
            }
        }
    }

    /// Releases the in-flight slot of a call whose task died. An explicit
    /// refresh that died counts as failed and ends the session.
    fn abandon(&self, kind: FlightKind, epoch: u64) {
        let mut control = self.lock_control();
        let ours = control
            .in_flight
            .as_ref()
            .filter(|flight| flight.kind == kind && flight.epoch == epoch)
            .map(|flight| flight.kind == FlightKind::Refresh && flight.explicit);
        match ours {
            Some(true) => self.logout_locked(&mut control),
            Some(false) => {
                control.in_flight = None;
                self.state.send_modify(|state| state.is_loading = false);
            }
            None => {}
        }
    }

    fn logout_locked(&self, control: &mut Control) {
        self.timer.cancel();
        let abandoned = control.in_flight.take().is_some();
        control.epoch += 1;

        let was_logged_in = self.state.borrow().is_logged_in();
        self.state.send_replace(SessionState::default());

        if was_logged_in {
            info!(abandoned, "logged out");
        } else {
            debug!(abandoned, "logout on empty session");
        }
    }

    /// (Re)arms the proactive refresh for the current token.
    ///
    /// Callers hold the control lock, so a concurrent logout can't slip in
    /// between reading the expiry and arming the timer.
    ///
    /// - no expiry known: nothing is scheduled
    /// - `expires_at - threshold` in the future: timer fires then
    /// - already inside the threshold but not expired: refresh right away
    /// - already expired: nothing; the next explicit refresh decides
    fn schedule_automatic_refresh(self: &Arc<Self>) {
        self.timer.cancel();

        let Some(expires_at) = self.state.borrow().expires_at else {
            return;
        };
        let now = self.clock.now();
        let delay = (expires_at - now)
            .checked_sub(&self.config.threshold_delta())
            .unwrap_or(TimeDelta::MIN);

        if delay > TimeDelta::zero() {
            let delay = delay.to_std().unwrap_or(Duration::MAX);
            let weak = Arc::downgrade(self);
            self.timer.schedule(delay, move || {
                if let Some(inner) = weak.upgrade() {
                    tokio::spawn(run_automatic_refresh(inner));
                }
            });
            debug!(delay_secs = delay.as_secs(), "automatic refresh scheduled");
        } else if now < expires_at {
            debug!("token inside refresh threshold, refreshing now");
            tokio::spawn(run_automatic_refresh(Arc::clone(self)));
        } else {
            debug!("token already expired, no automatic refresh");
        }
    }
}

/// The timer-driven refresh. Failures are logged and otherwise ignored:
/// the session stays as it is until the token actually expires or the
/// next explicit refresh fails.
async fn run_automatic_refresh<T: AuthTransport>(inner: Arc<Inner<T>>) {
    let flight = match inner.start_or_join_refresh(false) {
        Ok(flight) => flight,
        Err(err) => {
            debug!(error = %err, "automatic refresh skipped");
            return;
        }
    };

    match flight.await {
        Ok(_) => debug!("automatic refresh completed"),
        Err(err) => warn!(error = %err, "automatic refresh failed, keeping current session"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use chrono::{DateTime, Utc};
    use tessera_clock::ManualClock;

    fn t0() -> DateTime<Utc> {
        "2026-10-18T12:00:00Z".parse().unwrap()
    }

    /// Answers every call with a token valid for one hour from `t0()`.
    #[derive(Default)]
    struct FixedTransport {
        calls: AtomicUsize,
    }

    impl FixedTransport {
        fn response(&self) -> LoginResponse {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            LoginResponse {
                access_token: format!("T{n}"),
                refresh_token: format!("R{n}"),
                expires_at: t0() + TimeDelta::hours(1),
                roles: vec!["Proprietario".into()],
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

    fn manager_at(clock: Arc<ManualClock>) -> SessionManager<FixedTransport> {
        SessionManager::with_clock(SessionConfig::default(), FixedTransport::default(), clock)
    }

    // =====================================================================
    // Queries driven by a manual clock
    // =====================================================================

    #[tokio::test]
    async fn test_queries_track_manual_clock() {
        let clock = Arc::new(ManualClock::new(t0()));
        let manager = manager_at(Arc::clone(&clock));
        manager.login(Credentials::new("u", "p")).await.unwrap();

        assert!(manager.is_authenticated());
        assert!(!manager.should_refresh_token());
        assert_eq!(manager.token_time_remaining(), Duration::from_secs(3600));
        assert_eq!(manager.phase(), SessionPhase::LoggedIn);

        clock.advance(TimeDelta::minutes(56));
        assert!(manager.should_refresh_token());
        assert!(manager.is_authenticated());
        assert_eq!(manager.phase(), SessionPhase::ExpiringSoon);

        clock.advance(TimeDelta::minutes(4));
        assert!(manager.is_token_expired());
        assert!(!manager.is_authenticated());
        assert_eq!(manager.token_time_remaining(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_login_bumps_epoch_and_clears_flight() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.login(Credentials::new("u", "p")).await.unwrap();

        let control = manager.inner.lock_control();
        assert_eq!(control.epoch, 1);
        assert!(control.in_flight.is_none());
    }

    #[tokio::test]
    async fn test_logout_bumps_epoch_every_time() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.logout();
        manager.logout();
        assert_eq!(manager.inner.lock_control().epoch, 2);
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.login(Credentials::new("u", "p")).await.unwrap();
        let epoch = manager.inner.lock_control().epoch;
        manager.logout();

        let late = manager.inner.transport.response();
        let result = manager.inner.complete(FlightKind::Refresh, epoch, Ok(late));

        assert!(result.is_ok(), "caller still sees the transport result");
        assert_eq!(manager.token(), None, "logged-out session stays logged out");
    }

    /// Parks a refresh in the in-flight slot without running it.
    fn park_refresh(manager: &SessionManager<FixedTransport>, explicit: bool) -> u64 {
        let mut control = manager.inner.lock_control();
        let epoch = control.epoch;
        let result = std::future::pending::<Result<LoginResponse, SessionError>>()
            .boxed()
            .shared();
        control.in_flight = Some(InFlight {
            kind: FlightKind::Refresh,
            epoch,
            explicit,
            result,
        });
        epoch
    }

    #[tokio::test]
    async fn test_complete_failed_explicit_refresh_logs_out() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.login(Credentials::new("u", "p")).await.unwrap();
        let epoch = park_refresh(&manager, true);

        let failed = Err(TransportError::Unavailable("down".into()));
        let result = manager.inner.complete(FlightKind::Refresh, epoch, failed);

        assert!(matches!(result, Err(SessionError::Transport(_))));
        assert_eq!(manager.snapshot(), SessionState::default());
        assert!(manager.inner.lock_control().in_flight.is_none());
    }

    #[tokio::test]
    async fn test_complete_failed_automatic_refresh_keeps_session() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.login(Credentials::new("u", "p")).await.unwrap();
        let epoch = park_refresh(&manager, false);

        let failed = Err(TransportError::Unavailable("down".into()));
        let result = manager.inner.complete(FlightKind::Refresh, epoch, failed);

        assert!(result.is_err());
        assert_eq!(manager.token().as_deref(), Some("T1"));
        assert!(!manager.is_loading());
        assert!(manager.inner.lock_control().in_flight.is_none());
    }

    #[tokio::test]
    async fn test_joining_automatic_refresh_marks_it_explicit() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.login(Credentials::new("u", "p")).await.unwrap();
        park_refresh(&manager, false);

        manager.inner.start_or_join_refresh(true).unwrap();

        let control = manager.inner.lock_control();
        assert!(control.in_flight.as_ref().is_some_and(|flight| flight.explicit));
    }

    #[tokio::test]
    async fn test_login_schedules_refresh_for_long_lived_token() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.login(Credentials::new("u", "p")).await.unwrap();
        assert!(manager.is_refresh_scheduled());

        manager.logout();
        assert!(!manager.is_refresh_scheduled());
    }

    #[tokio::test]
    async fn test_debug_does_not_leak_tokens() {
        let manager = manager_at(Arc::new(ManualClock::new(t0())));
        manager.login(Credentials::new("u", "p")).await.unwrap();

        let debug = format!("{manager:?}");
        assert!(!debug.contains("\"T1\""), "{debug}");
        assert!(!debug.contains("\"R1\""), "{debug}");
        assert!(debug.contains("<redacted>"), "{debug}");
    }
}
