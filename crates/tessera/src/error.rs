//! Unified error type for Tessera.

use tessera_protocol::ProtocolError;
use tessera_session::SessionError;
use tessera_store::StoreError;
use tessera_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `tessera` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant generates the `From` impls,
/// so `?` converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum TesseraError {
    /// Encoding or validating an auth payload failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The auth API call failed, or the transport is misconfigured.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A session operation failed (no refresh token, busy, ...).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Reading or writing the persisted session failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
