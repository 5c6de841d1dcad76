//! Per-request authentication for RPC calls
//!
//! Clients sign each call with an Ed25519 key; servers verify the signer is
//! trusted and the signature covers the request before running any handler.
//!
//! ## Architecture
//!
//! - **Canonicalization**: request fields to the exact bytes that get signed
//! - **Key store**: trusted public keys by key identifier
//! - **Signing / verification**: Ed25519 over the canonical payload
//! - **Transport**: credentials in the body (Echo) or as call attributes (Add)

pub mod api;
pub mod auth;
pub mod canonical;
pub mod client;
pub mod config;
pub mod crypto;
pub mod error;
pub mod keyfile;
pub mod keystore;
pub mod state;
pub mod transport;
pub mod types;

pub use auth::AuthVerdict;
pub use config::Config;
pub use error::{ApiError, ApiResult};
pub use keystore::{KeyStore, TrustedKeyStore};
pub use state::AppState;
