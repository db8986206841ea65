//! The `Tessera` builder: one configured [`SessionManager`] per app.

use std::sync::Arc;

use tessera_clock::{Clock, SystemClock};
use tessera_session::{SessionConfig, SessionManager};
use tessera_store::{KeyValueStore, SessionPersistence};
use tessera_transport::AuthTransport;
#[cfg(feature = "http")]
use tessera_transport::{HttpTransport, HttpTransportConfig};
use tracing::info;

use crate::TesseraError;

/// Entry point for building a session manager.
///
/// ```rust,ignore
/// let session = Tessera::builder()
///     .store(Arc::new(FileStore::open("session.json")?))
///     .build_http(HttpTransportConfig::from_env())?;
/// ```
#[derive(Debug, Clone, Copy)]
pub struct Tessera;

impl Tessera {
    /// Creates a new builder.
    pub fn builder() -> TesseraBuilder {
        TesseraBuilder::new()
    }
}

/// Builder for configuring a [`SessionManager`].
///
/// Build it once at startup and pass the manager (or clones of it)
/// to whatever needs the session.
pub struct TesseraBuilder {
    config: SessionConfig,
    clock: Option<Arc<dyn Clock>>,
    store: Option<Arc<dyn KeyValueStore>>,
}

impl TesseraBuilder {
    /// Creates a builder with default settings: 5-minute refresh
    /// threshold, system clock, no persistence.
    pub fn new() -> Self {
        Self {
            config: SessionConfig::default(),
            clock: None,
            store: None,
        }
    }

    /// Sets the session configuration.
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the time source (defaults to the system clock).
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Persists the session in `store`: the saved session is restored on
    /// build and every later change is written back.
    pub fn store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Builds the manager around `transport`.
    ///
    /// Must be called from within a Tokio runtime when a store is set or
    /// a saved session is restored (both start background tasks).
    ///
    /// # Errors
    /// [`TesseraError::Store`] if the store can't be read.
    pub fn build<T: AuthTransport>(self, transport: T) -> Result<SessionManager<T>, TesseraError> {
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let threshold_secs = self.config.refresh_threshold.as_secs();
        let manager = SessionManager::with_clock(self.config, transport, clock);

        if let Some(store) = self.store {
            let persistence = SessionPersistence::new(store);
            let saved = persistence.load()?;
            if saved.is_logged_in() {
                manager.restore(saved);
            }
            persistence.attach(&manager);
        }

        info!(
            refresh_threshold_secs = threshold_secs,
            logged_in = manager.token().is_some(),
            "session manager ready"
        );
        Ok(manager)
    }

    /// Builds the manager around an [`HttpTransport`].
    ///
    /// # Errors
    /// [`TesseraError::Transport`] if `config` is invalid, plus the
    /// errors of [`build`](Self::build).
    #[cfg(feature = "http")]
    pub fn build_http(
        self,
        config: HttpTransportConfig,
    ) -> Result<SessionManager<HttpTransport>, TesseraError> {
        let transport = HttpTransport::new(config)?;
        self.build(transport)
    }
}

impl Default for TesseraBuilder {
    fn default() -> Self {
        Self::new()
    }
}
