//! Platform-agnostic core of the BIS progressive web app client.
//!
//! - [`agent`]: the service worker's offline cache and push notification handling.
//! - [`webauthn`]: the browser side of passkey registration and login.
//!
//! Browser APIs are reached only through the traits in [`agent`] and
//! [`webauthn::CredentialPlatform`]; the `pwakit-wasm` crate implements them with `web-sys`.
#![deny(clippy::all, clippy::pedantic, clippy::nursery)]

pub mod agent;

pub mod base64url;

mod config;
pub use config::*;

mod error;
pub use error::*;

pub mod logger;

pub mod webauthn;

// private modules
mod http_request;
