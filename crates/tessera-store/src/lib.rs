//! Optional session persistence for Tessera.
//!
//! The session manager itself keeps everything in memory. This crate
//! adds the "remember me across restarts" layer on top:
//!
//! - [`KeyValueStore`]: a minimal string key/value store, with an
//!   in-process [`MemoryStore`] and a single-file [`FileStore`]
//! - [`SessionPersistence`]: reads a saved session once at startup
//!   ([`load`](SessionPersistence::load)) and writes every change back
//!   ([`attach`](SessionPersistence::attach))
//!
//! # Stored layout
//!
//! | Key                | Value                         |
//! |--------------------|-------------------------------|
//! | `auth.token`       | access token, raw string      |
//! | `auth.refreshToken`| refresh token, raw string     |
//! | `auth.expiresAt`   | RFC 3339 timestamp            |
//! | `auth.roles`       | JSON array of strings         |
//! | `auth.user`        | JSON object (user profile)    |
//!
//! A value that fails to parse is dropped from the store and read as
//! absent; it never prevents startup.

mod error;
mod file;
mod memory;
mod persistence;

pub use error::StoreError;
pub use file::FileStore;
pub use memory::MemoryStore;
pub use persistence::{
    KEY_EXPIRES_AT, KEY_REFRESH_TOKEN, KEY_ROLES, KEY_TOKEN, KEY_USER, SESSION_KEYS,
    SessionPersistence,
};

/// A synchronous string key/value store.
///
/// Values are small (a few hundred bytes per key) and written a handful of
/// times per hour, so implementations are expected to block briefly
/// rather than be async.
///
/// `Send + Sync` so one store can be shared between the application and
/// the background write-through task.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value for `key`, or `None` if it isn't set.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Sets `key` to `value`, replacing any previous value.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing a missing key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}
