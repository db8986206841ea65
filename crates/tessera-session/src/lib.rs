//! Session lifecycle for Tessera.
//!
//! This crate owns the client's authenticated session:
//!
//! 1. **Login / logout**: exchanging credentials for a token set, and
//!    throwing it away ([`SessionManager::login`], [`SessionManager::logout`])
//! 2. **Refresh**: renewing the access token, with any number of
//!    concurrent requests served by a single network call
//!    ([`SessionManager::refresh_token`])
//! 3. **Proactive refresh**: a timer that renews the token a configurable
//!    lead time before it expires ([`SessionConfig::refresh_threshold`])
//! 4. **Queries**: synchronous "am I logged in / which roles do I have"
//!    answers for guards and UI
//!
//! # Failure policy
//!
//! An *explicit* refresh that fails ends the session: the caller asked
//! for a working token and there isn't one. An *automatic* refresh that
//! fails leaves the session alone and logs a warning. No retry is
//! scheduled; the next explicit refresh decides.
//!
//! # How it fits in the stack
//!
//! ```text
//! Application / persistence (above)  ← reads state, subscribes to changes
//!     ↕
//! Session Layer (this crate)  ← token lifecycle, refresh coalescing, timer
//!     ↕
//! Transport Layer (below)  ← login/refresh calls over HTTP (or a stub)
//! ```

mod error;
mod manager;
mod session;

pub use error::SessionError;
pub use manager::SessionManager;
pub use session::{
    OWNER_ROLE, REFRESH_THRESHOLD_ENV, SessionConfig, SessionPhase, SessionState,
};
