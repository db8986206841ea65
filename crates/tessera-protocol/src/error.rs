//! Error types for the protocol layer.
//!
//! Each crate in Tessera defines its own error enum. A `ProtocolError`
//! always means the bytes or the message shape were wrong, never that the
//! network or the session misbehaved.

/// Errors that can occur while encoding, decoding, or validating messages.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, missing required fields, or an
    /// `expiresAt` that isn't an RFC 3339 timestamp.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The message decoded fine but violates the API contract, e.g. a
    /// login response with an empty access token.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
