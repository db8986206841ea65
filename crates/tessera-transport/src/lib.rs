//! Transport abstraction for the authentication API.
//!
//! Provides the [`AuthTransport`] trait: the two network calls the session
//! layer needs (login and refresh). The session manager never touches
//! HTTP directly, which is what lets its tests drive it with an in-memory
//! stub.
//!
//! # Feature Flags
//!
//! - `http` (default): [`HttpTransport`] via `reqwest`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "http")]
mod http;

pub use error::TransportError;
#[cfg(feature = "http")]
pub use http::{HttpTransport, HttpTransportConfig};

use std::future::Future;
use std::sync::Arc;

use tessera_protocol::{Credentials, LoginResponse, RefreshRequest};

/// Performs the login and refresh calls against the auth API.
///
/// # Trait bounds
///
/// - `Send + Sync + 'static` → one transport is shared by every clone of
///   the session manager and by its background refresh task.
/// - The returned futures are `Send` so the manager can run them inside
///   `tokio::spawn`.
///
/// Implementors just write `async fn`; the compiler checks the `Send`
/// bound for them.
pub trait AuthTransport: Send + Sync + 'static {
    /// Exchanges a username/password for a fresh token set.
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send;

    /// Exchanges the current token pair for a new one.
    fn refresh(
        &self,
        request: &RefreshRequest,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send;
}

/// Sharing a transport behind an `Arc` is common in tests (the test keeps
/// one handle to inspect call counts, the manager owns the other).
impl<T: AuthTransport> AuthTransport for Arc<T> {
    fn login(
        &self,
        credentials: &Credentials,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send {
        (**self).login(credentials)
    }

    fn refresh(
        &self,
        request: &RefreshRequest,
    ) -> impl Future<Output = Result<LoginResponse, TransportError>> + Send {
        (**self).refresh(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::atomic::{AtomicUsize, Ordering};

    use tessera_protocol::UserIdentity;

    struct CountingTransport {
        logins: AtomicUsize,
    }

    impl AuthTransport for CountingTransport {
        async fn login(
            &self,
            credentials: &Credentials,
        ) -> Result<LoginResponse, TransportError> {
            self.logins.fetch_add(1, Ordering::SeqCst);
            Ok(LoginResponse {
                access_token: format!("token-for-{}", credentials.username),
                refresh_token: "r".into(),
                expires_at: chrono::Utc::now(),
                roles: vec![],
                user: UserIdentity {
                    id: "1".into(),
                    user_name: credentials.username.clone(),
                    email: String::new(),
                    display_name: String::new(),
                },
            })
        }

        async fn refresh(
            &self,
            _request: &RefreshRequest,
        ) -> Result<LoginResponse, TransportError> {
            Err(TransportError::Unauthorized)
        }
    }

    #[tokio::test]
    async fn test_arc_transport_delegates_to_inner() {
        let inner = Arc::new(CountingTransport {
            logins: AtomicUsize::new(0),
        });
        let shared = Arc::clone(&inner);

        let resp = shared.login(&Credentials::new("ana", "pw")).await.unwrap();

        assert_eq!(resp.access_token, "token-for-ana");
        assert_eq!(inner.logins.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_arc_transport_propagates_errors_unchanged() {
        let shared = Arc::new(CountingTransport {
            logins: AtomicUsize::new(0),
        });

        let result = shared
            .refresh(&RefreshRequest {
                access_token: "a".into(),
                refresh_token: "r".into(),
            })
            .await;

        assert!(matches!(result, Err(TransportError::Unauthorized)));
    }

    #[test]
    fn test_transport_error_display_includes_status_and_body() {
        let err = TransportError::Status {
            status: 503,
            body: "maintenance".into(),
        };
        assert_eq!(err.to_string(), "unexpected status 503: maintenance");
    }

    #[test]
    fn test_protocol_error_converts_via_from() {
        let err: TransportError =
            tessera_protocol::ProtocolError::InvalidMessage("bad".into()).into();
        assert!(matches!(err, TransportError::Protocol(_)));
        assert_eq!(err.to_string(), "invalid message: bad");
    }
}
