//! Error types for the persistence layer.

/// Errors that can occur while reading or writing persisted session data.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing file could not be read, written or renamed.
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value (or the whole file) could not be parsed. Callers
    /// treat the value as absent.
    #[error("corrupted value for {key}: {reason}")]
    Corrupted { key: String, reason: String },

    /// A value could not be serialized for storage.
    #[error("failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}
