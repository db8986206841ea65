//! Wire types exchanged with the authentication API.
//!
//! These are the structures that get serialized into request bodies and
//! deserialized out of responses. The API speaks camelCase JSON, so every
//! type here carries `#[serde(rename_all = "camelCase")]`:
//!
//! ```text
//! POST /api/auth/login    { "username": "u", "password": "p" }
//! POST /api/auth/refresh  { "accessToken": "T1", "refreshToken": "R1" }
//!        ← both return →  { "accessToken", "refreshToken", "expiresAt",
//!                           "roles": [..], "user": { .. } }
//! ```

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Credentials
// ---------------------------------------------------------------------------

/// A username/password pair submitted on the login screen.
///
/// `Debug` is implemented by hand so the password never ends up in a log
/// line, even when someone writes `tracing::debug!(?credentials)`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// The account name typed by the user.
    pub username: String,
    /// The plaintext password. Only ever sent to the login endpoint.
    pub password: String,
}

impl Credentials {
    /// Convenience constructor: `Credentials::new("u", "p")`.
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

// ---------------------------------------------------------------------------
// RefreshRequest
// ---------------------------------------------------------------------------

/// Body of the refresh call: the current token pair.
///
/// The server needs the (possibly expired) access token as well as the
/// refresh token so it can tie the refresh to the session it issued.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub access_token: String,
    pub refresh_token: String,
}

impl fmt::Debug for RefreshRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshRequest").finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// UserIdentity
// ---------------------------------------------------------------------------

/// Profile snapshot of the signed-in user, as returned by login/refresh.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    /// Server-side user id. Opaque string (the API uses GUIDs in
    /// production and short numeric strings in fixtures).
    pub id: String,
    pub user_name: String,
    pub email: String,
    pub display_name: String,
}

// ---------------------------------------------------------------------------
// LoginResponse
// ---------------------------------------------------------------------------

/// What the server returns from both the login and the refresh endpoint.
///
/// `expires_at` is an ISO-8601 / RFC 3339 timestamp on the wire. chrono's
/// serde support parses it straight into a `DateTime<Utc>`, so a malformed
/// timestamp is a decode error rather than a string we carry around and
/// reparse later.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub roles: Vec<String>,
    pub user: UserIdentity,
}

impl LoginResponse {
    /// Checks the response for things serde can't express: empty tokens.
    ///
    /// An empty access token would put the session into a "logged in with
    /// nothing" state, which every later check would have to special-case.
    /// Rejecting it here keeps that state unrepresentable.
    ///
    /// # Errors
    /// Returns [`ProtocolError::InvalidMessage`] naming the empty field.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.access_token.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "accessToken must not be empty".into(),
            ));
        }
        if self.refresh_token.trim().is_empty() {
            return Err(ProtocolError::InvalidMessage(
                "refreshToken must not be empty".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for LoginResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginResponse")
            .field("expires_at", &self.expires_at)
            .field("roles", &self.roles)
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
