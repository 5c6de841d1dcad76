//! Client for the Echo and Add calls
//!
//! Signs every request with the client's private key before sending it.

use std::time::Duration;

use ed25519_dalek::SigningKey;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use crate::crypto::RequestSigner;
use crate::transport::{build_signed_add, build_signed_echo, BindingError};
use crate::types::{AddReply, ApiResponse, EchoReply};

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server rejected the call as unauthenticated")]
    Unauthenticated,

    #[error("Server error ({status}): {message}")]
    Server { status: StatusCode, message: String },

    #[error("Cannot sign request: {0}")]
    Signing(#[from] BindingError),
}

pub type ClientResult<T> = Result<T, ClientError>;

pub struct Client {
    base_url: String,
    http: reqwest::Client,
    signer: RequestSigner,
}

impl Client {
    pub fn new(base_url: impl Into<String>, signing_key: SigningKey) -> ClientResult<Self> {
        Self::with_timeout(base_url, signing_key, Duration::from_secs(1))
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        signing_key: SigningKey,
        timeout: Duration,
    ) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http,
            signer: RequestSigner::new(signing_key),
        })
    }

    pub fn key_id(&self) -> &str {
        self.signer.key_id()
    }

    /// Echo call; credentials travel inside the body
    pub async fn echo(&self, message: &str) -> ClientResult<String> {
        let req = build_signed_echo(&self.signer, message);
        tracing::debug!(key = %self.key_id(), "Sending echo");

        let resp = self
            .http
            .post(format!("{}/echo", self.base_url))
            .json(&req)
            .send()
            .await?;

        let reply: EchoReply = read_reply(resp).await?;
        Ok(reply.message)
    }

    /// Add call; credentials travel as the `key` and `signature` attributes
    pub async fn add(&self, a: f64, b: f64) -> ClientResult<f64> {
        let signed = build_signed_add(&self.signer, a, b)?;
        tracing::debug!(key = %self.key_id(), "Sending add");

        let mut req = self
            .http
            .post(format!("{}/add", self.base_url))
            .json(&signed.request);
        for (name, value) in signed.attributes.to_pairs() {
            req = req.header(name, value);
        }

        let reply: AddReply = read_reply(req.send().await?).await?;
        Ok(reply.result)
    }
}

async fn read_reply<T: DeserializeOwned>(resp: reqwest::Response) -> ClientResult<T> {
    let status = resp.status();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ClientError::Unauthenticated);
    }

    let body: ApiResponse<T> = resp.json().await?;
    match body.data {
        Some(data) if status.is_success() && body.success => Ok(data),
        _ => Err(ClientError::Server {
            status,
            message: body.error.unwrap_or_else(|| "empty response".into()),
        }),
    }
}
