//! HTTP transport implementation using `reqwest`.

use std::time::Duration;

use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use tessera_protocol::{
    Codec, Credentials, JsonCodec, LoginResponse, RefreshRequest,
};

use crate::{AuthTransport, TransportError};

/// Longest error body we keep in [`TransportError::Status`]. Gateways
/// like to answer with a full HTML page.
const MAX_ERROR_BODY: usize = 512;

// ---------------------------------------------------------------------------
// HttpTransportConfig
// ---------------------------------------------------------------------------

/// Where the auth endpoints live and how long to wait for them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpTransportConfig {
    /// Scheme + host (+ optional prefix), e.g. `https://api.example.com`.
    pub base_url: String,
    /// Path of the login endpoint, appended to `base_url`.
    pub login_path: String,
    /// Path of the refresh endpoint, appended to `base_url`.
    pub refresh_path: String,
    /// Whole-request timeout (connect + send + read body).
    pub timeout: Duration,
}

impl Default for HttpTransportConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            login_path: "/api/auth/login".to_string(),
            refresh_path: "/api/auth/refresh".to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl HttpTransportConfig {
    /// Defaults overridden by `TESSERA_AUTH_BASE_URL` and
    /// `TESSERA_AUTH_TIMEOUT_SECS`. Unparseable values are ignored.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(base_url) = std::env::var("TESSERA_AUTH_BASE_URL") {
            config.base_url = base_url;
        }
        if let Ok(secs) = std::env::var("TESSERA_AUTH_TIMEOUT_SECS") {
            match secs.parse::<u64>() {
                Ok(secs) => config.timeout = Duration::from_secs(secs),
                Err(_) => tracing::warn!(
                    value = %secs,
                    "ignoring invalid TESSERA_AUTH_TIMEOUT_SECS"
                ),
            }
        }
        config
    }

    /// Joins `base_url` and `path` with exactly one slash between them.
    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// ---------------------------------------------------------------------------
// HttpTransport
// ---------------------------------------------------------------------------

/// An [`AuthTransport`] that POSTs to the auth API over HTTP(S).
///
/// The body format is pluggable through the [`Codec`] parameter; the API
/// only speaks JSON today, so `JsonCodec` is the default.
#[derive(Debug, Clone)]
pub struct HttpTransport<C: Codec = JsonCodec> {
    client: reqwest::Client,
    config: HttpTransportConfig,
    codec: C,
}

impl HttpTransport<JsonCodec> {
    /// Creates a JSON transport for the given endpoints.
    ///
    /// # Errors
    /// [`TransportError::InvalidConfig`] if `base_url` has no http(s)
    /// scheme, [`TransportError::Request`] if the client can't be built.
    pub fn new(config: HttpTransportConfig) -> Result<Self, TransportError> {
        Self::with_codec(config, JsonCodec)
    }
}

impl<C: Codec> HttpTransport<C> {
    /// Creates a transport that encodes bodies with `codec`.
    pub fn with_codec(
        config: HttpTransportConfig,
        codec: C,
    ) -> Result<Self, TransportError> {
        if !(config.base_url.starts_with("http://")
            || config.base_url.starts_with("https://"))
        {
            return Err(TransportError::InvalidConfig(format!(
                "base_url must start with http:// or https://, got {:?}",
                config.base_url
            )));
        }

        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(TransportError::Request)?;

        tracing::debug!(base_url = %config.base_url, "HTTP auth transport ready");
        Ok(Self {
            client,
            config,
            codec,
        })
    }

    /// The endpoints this transport talks to.
    pub fn config(&self) -> &HttpTransportConfig {
        &self.config
    }

    /// POSTs `body` to `path` and decodes a [`LoginResponse`].
    async fn post<B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<LoginResponse, TransportError> {
        let url = self.config.endpoint(path);
        let payload = self.codec.encode(body)?;

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, self.codec.content_type())
            .header(ACCEPT, self.codec.content_type())
            .body(payload)
            .send()
            .await
            .map_err(TransportError::Request)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            tracing::debug!(%url, %status, "auth endpoint rejected request");
            return Err(TransportError::Unauthorized);
        }

        let bytes = response.bytes().await.map_err(TransportError::Request)?;
        if !status.is_success() {
            let mut body = String::from_utf8_lossy(&bytes).into_owned();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let decoded: LoginResponse = self.codec.decode(&bytes)?;
        decoded.validate()?;
        Ok(decoded)
    }
}

impl<C: Codec> AuthTransport for HttpTransport<C> {
    async fn login(
        &self,
        credentials: &Credentials,
    ) -> Result<LoginResponse, TransportError> {
        self.post(&self.config.login_path, credentials).await
    }

    async fn refresh(
        &self,
        request: &RefreshRequest,
    ) -> Result<LoginResponse, TransportError> {
        self.post(&self.config.refresh_path, request).await
    }
}
