use tessera_protocol::ProtocolError;

/// Errors that can occur while talking to the authentication API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The server refused the credentials or the refresh token
    /// (HTTP 401/403).
    #[error("authentication rejected by server")]
    Unauthorized,

    /// The server answered with a non-success status other than 401/403.
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },

    /// The request never produced a response (DNS, connect, timeout).
    #[cfg(feature = "http")]
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    /// The transport could not be reached at all. Used by non-HTTP
    /// transports and test doubles.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The response body could not be decoded or failed validation.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The transport was configured with values it can't use
    /// (e.g. a base URL without a scheme).
    #[error("invalid transport config: {0}")]
    InvalidConfig(String),
}
