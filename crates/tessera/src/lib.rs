//! # Tessera
//!
//! Client-side session and token lifecycle management.
//!
//! Tessera keeps an application's authenticated session alive: it logs
//! in, stores the token set, refreshes the access token shortly before it
//! expires, coalesces concurrent refresh requests into one network call,
//! and logs out when an explicit refresh fails. The pieces live in
//! separate crates; this one wires them together:
//!
//! | Crate               | Role                                         |
//! |---------------------|----------------------------------------------|
//! | `tessera-protocol`  | request/response types and the codec         |
//! | `tessera-transport` | [`AuthTransport`](prelude::AuthTransport) and the HTTP client |
//! | `tessera-clock`     | time sources and the refresh timer           |
//! | `tessera-session`   | [`SessionManager`](prelude::SessionManager)  |
//! | `tessera-store`     | optional persistence                         |
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use tessera::prelude::*;
//!
//! # async fn run() -> Result<(), TesseraError> {
//! tessera::init_tracing();
//!
//! let session = Tessera::builder()
//!     .config(SessionConfig::from_env())
//!     .build_http(HttpTransportConfig::from_env())?;
//!
//! session.login(Credentials::new("user", "secret")).await?;
//! assert!(session.is_authenticated());
//! # Ok(())
//! # }
//! ```

mod builder;
mod error;

pub use builder::{Tessera, TesseraBuilder};
pub use error::TesseraError;

pub use tessera_clock as clock;
pub use tessera_protocol as protocol;
pub use tessera_session as session;
pub use tessera_store as store;
pub use tessera_transport as transport;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber filtered by `RUST_LOG` (default `info`).
///
/// Returns `false` if a global subscriber was already installed, in which
/// case nothing changes.
pub fn init_tracing() -> bool {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .try_init()
        .is_ok()
}

/// Everything an application typically needs, in one import.
pub mod prelude {
    pub use crate::{Tessera, TesseraBuilder, TesseraError};

    pub use tessera_clock::{Clock, MonotonicClock, SystemClock};
    pub use tessera_protocol::{Credentials, LoginResponse, UserIdentity};
    pub use tessera_session::{
        OWNER_ROLE, SessionConfig, SessionError, SessionManager, SessionPhase, SessionState,
    };
    pub use tessera_store::{FileStore, KeyValueStore, MemoryStore, SessionPersistence};
    pub use tessera_transport::{AuthTransport, TransportError};
    #[cfg(feature = "http")]
    pub use tessera_transport::{HttpTransport, HttpTransportConfig};
}
