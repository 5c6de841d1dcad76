//! Wire types for the Echo and Add calls
//!
//! Echo carries its credentials inside the request body.
//! Add carries them out-of-band as call attributes (see [`crate::transport`]).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Key identifier: base64 of the raw public key bytes
pub type KeyId = String;

// ============ Echo ============

/// Echo request with embedded credentials
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EchoRequest {
    pub message: String,
    /// Key identifier of the signer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_key: Option<KeyId>,
    /// Base64 signature over the message bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EchoReply {
    pub message: String,
}

// ============ Add ============

/// Add request. Credentials travel as call attributes, not in here.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AddRequest {
    pub a: f64,
    pub b: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct AddReply {
    pub result: f64,
}

// ============ Response Envelope ============

/// Standard API response wrapper
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            hint: None,
        }
    }
}

impl ApiResponse<()> {
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            hint: None,
        }
    }

    pub fn error_with_hint(message: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
            hint: Some(hint.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    /// Absent when the key store cannot count its keys
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trusted_keys: Option<usize>,
    pub echo_handled: u64,
    pub add_handled: u64,
    pub rejected: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_request_credentials_optional() {
        let req: EchoRequest = serde_json::from_str(r#"{"message":"hi"}"#).unwrap();
        assert_eq!(req.message, "hi");
        assert!(req.public_key.is_none());
        assert!(req.signature.is_none());

        let json = serde_json::to_string(&req).unwrap();
        assert_eq!(json, r#"{"message":"hi"}"#);
    }

    #[test]
    fn test_error_response_shape() {
        let body = serde_json::to_value(ApiResponse::<()>::error_with_hint("nope", "try again")).unwrap();
        assert_eq!(body["success"], false);
        assert_eq!(body["error"], "nope");
        assert_eq!(body["hint"], "try again");
        assert!(body.get("data").is_none());
    }
}
