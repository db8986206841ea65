//! Session types: configuration, the state record, and its phases.
//!
//! The session is a single record that is either completely empty
//! (logged out) or carries a full token set from the last successful
//! login/refresh. Everything the UI needs to decide "show the login
//! screen or the dashboard?" can be computed from a [`SessionState`] and
//! the current time.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tessera_protocol::{LoginResponse, UserIdentity};

/// Role granted to establishment owners.
pub const OWNER_ROLE: &str = "Proprietario";

/// Environment variable overriding [`SessionConfig::refresh_threshold`],
/// in whole seconds.
pub const REFRESH_THRESHOLD_ENV: &str = "TESSERA_REFRESH_THRESHOLD_SECS";

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Configuration for session behavior.
///
/// Read once when the manager is built. There is exactly one knob today:
/// how far ahead of expiry the proactive refresh kicks in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Lead time before `expires_at` at which the token is refreshed.
    ///
    /// Default: 5 minutes.
    pub refresh_threshold: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            refresh_threshold: Duration::from_secs(5 * 60),
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by [`REFRESH_THRESHOLD_ENV`] when it holds a
    /// valid number of seconds.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Shorthand for a config with a custom threshold.
    pub fn with_refresh_threshold(refresh_threshold: Duration) -> Self {
        Self { refresh_threshold }
    }

    /// Applies overrides from any key/value source. Invalid values are
    /// logged and ignored so a typo in the environment never prevents
    /// startup.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(REFRESH_THRESHOLD_ENV) {
            match raw.trim().parse::<u64>() {
                Ok(secs) => self.refresh_threshold = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    key = REFRESH_THRESHOLD_ENV,
                    value = %raw,
                    "ignoring invalid refresh threshold"
                ),
            }
        }
    }

    /// The threshold as a signed chrono delta, saturating on overflow.
    pub(crate) fn threshold_delta(&self) -> TimeDelta {
        TimeDelta::from_std(self.refresh_threshold).unwrap_or(TimeDelta::MAX)
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// The authenticated session as the client sees it.
///
/// Invariant: if `access_token` is `None`, every other field except
/// `is_loading` is empty too. [`SessionState::normalized`] enforces that
/// for states that come from outside (persistence).
///
/// `Debug` is hand-written so tokens never reach a log line.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    /// Bearer token for API calls. Present iff logged in. May be expired.
    pub access_token: Option<String>,

    /// Credential used to mint a new access token.
    pub refresh_token: Option<String>,

    /// When `access_token` stops being valid. `None` counts as expired.
    pub expires_at: Option<DateTime<Utc>>,

    /// Roles granted to the user, in the order the server sent them,
    /// without duplicates.
    pub roles: Vec<String>,

    /// Profile snapshot from the last login/refresh.
    pub user: Option<UserIdentity>,

    /// A login or refresh call is outstanding.
    pub is_loading: bool,
}

impl SessionState {
    /// Builds a logged-in state from a login/refresh response.
    pub fn from_response(response: &LoginResponse) -> Self {
        let mut roles: Vec<String> = Vec::with_capacity(response.roles.len());
        for role in &response.roles {
            if !roles.contains(role) {
                roles.push(role.clone());
            }
        }

        Self {
            access_token: Some(response.access_token.clone()),
            refresh_token: Some(response.refresh_token.clone()),
            expires_at: Some(response.expires_at),
            roles,
            user: Some(response.user.clone()),
            is_loading: false,
        }
    }

    /// Enforces the all-or-nothing invariant and clears `is_loading`
    /// (a loading flag never survives a restart).
    pub fn normalized(self) -> Self {
        if self.access_token.is_none() {
            return Self::default();
        }
        Self {
            is_loading: false,
            ..self
        }
    }

    /// `true` if an access token is held (expired or not).
    pub fn is_logged_in(&self) -> bool {
        self.access_token.is_some()
    }

    /// Fail-closed expiry check: no expiry known means expired.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now >= expires_at,
            None => true,
        }
    }

    /// `true` when the token expires within `threshold` of `now`
    /// (including tokens that already expired).
    pub fn should_refresh_at(&self, now: DateTime<Utc>, threshold: TimeDelta) -> bool {
        self.expires_at
            .is_some_and(|expires_at| expires_at - now <= threshold)
    }

    /// `max(0, expires_at - now)`; zero when no expiry is known.
    pub fn time_remaining_at(&self, now: DateTime<Utc>) -> Duration {
        self.expires_at
            .and_then(|expires_at| (expires_at - now).to_std().ok())
            .unwrap_or(Duration::ZERO)
    }

    /// `true` if the user holds `role` (exact, case-sensitive match).
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("access_token", &self.access_token.as_ref().map(|_| "<redacted>"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "<redacted>"))
            .field("expires_at", &self.expires_at)
            .field("roles", &self.roles)
            .field("user", &self.user.as_ref().map(|u| &u.id))
            .field("is_loading", &self.is_loading)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// SessionPhase
// ---------------------------------------------------------------------------

/// Where the session sits in its lifecycle.
///
/// ```text
///              login ok                 refresh ok
///  LoggedOut ───────────→ LoggedIn ←────────────────┐
///      ↑                    │  (time passes)        │
///      │                    ▼                       │
///      │               ExpiringSoon ──(refresh)──→ RefreshInFlight
///      │                                            │
///      └──── logout / explicit refresh failure ─────┘
/// ```
///
/// `RefreshInFlight` is transient: extra refresh requests made while in it
/// join the outstanding call instead of starting another. An automatic
/// refresh that fails goes back to `LoggedIn`/`ExpiringSoon` unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// No access token held. A login may be in progress (`is_loading`).
    LoggedOut,
    /// Token held and further from expiry than the refresh threshold.
    LoggedIn,
    /// Token held and within the refresh threshold (or already expired).
    ExpiringSoon,
    /// A token refresh call is outstanding.
    RefreshInFlight,
}
