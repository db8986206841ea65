//! Wire protocol for Tessera.
//!
//! This crate defines what the dashboard and the authentication API say to
//! each other:
//!
//! - **Types** ([`Credentials`], [`RefreshRequest`], [`LoginResponse`],
//!   [`UserIdentity`]): request and response bodies.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those bodies are
//!   converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong while doing so.
//!
//! It knows nothing about HTTP or sessions:
//!
//! ```text
//! Transport (HTTP) → Protocol (LoginResponse) → Session (state machine)
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::ProtocolError;
pub use types::{Credentials, LoginResponse, RefreshRequest, UserIdentity};
