//! Error types for the session layer.

use std::sync::Arc;

use tessera_transport::TransportError;

/// Errors returned by [`SessionManager`](crate::SessionManager)
/// operations.
///
/// `Clone` because one failed refresh is reported to every caller that
/// joined it; the transport error is shared behind an `Arc` for the same
/// reason.
#[derive(Debug, Clone, thiserror::Error)]
pub enum SessionError {
    /// A refresh was requested but the session holds no access token or
    /// no refresh token. No network call was made. The caller should send
    /// the user to the login screen.
    #[error("no refresh token available")]
    NoRefreshToken,

    /// A login was requested while another login or refresh call is still
    /// outstanding (or a refresh while a login is).
    #[error("another login or refresh is already in progress")]
    Busy,

    /// The auth API call failed. The transport's error, unmodified.
    #[error(transparent)]
    Transport(Arc<TransportError>),

    /// The background task running the auth call died before reporting
    /// a result (it panicked).
    #[error("auth call interrupted: {0}")]
    Interrupted(String),
}

impl SessionError {
    /// The underlying transport error, if that's what this is.
    pub fn transport(&self) -> Option<&TransportError> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        Self::Transport(Arc::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_error_display_is_passed_through() {
        let err: SessionError = TransportError::Unauthorized.into();
        assert_eq!(err.to_string(), "authentication rejected by server");
    }

    #[test]
    fn test_transport_accessor_exposes_inner_error() {
        let err: SessionError = TransportError::Status {
            status: 500,
            body: "boom".into(),
        }
        .into();
        assert!(matches!(
            err.transport(),
            Some(TransportError::Status { status: 500, .. })
        ));
        assert!(SessionError::NoRefreshToken.transport().is_none());
    }

    #[test]
    fn test_clones_share_the_same_transport_error() {
        let err: SessionError = TransportError::Unavailable("offline".into()).into();
        let copy = err.clone();
        match (&err, &copy) {
            (SessionError::Transport(a), SessionError::Transport(b)) => {
                assert!(Arc::ptr_eq(a, b));
            }
            _ => panic!("expected transport errors"),
        }
    }
}
