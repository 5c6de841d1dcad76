//! Where credentials travel on the wire
//!
//! Two shapes, fixed per call type:
//!
//! - **Echo** embeds `public_key` (key identifier) and `signature` (base64)
//!   in the request body next to `message`. Only `message` is signed.
//! - **Add** leaves the body as plain `{a, b}` and sends the key identifier
//!   and base64 signature as the call attributes `key` and `signature`.
//!
//! Both sides of each shape live here so the client and server cannot drift
//! apart. Nothing in this module knows about HTTP; the API layer converts
//! its headers into [`CallAttributes`] first.

use crate::auth::{verify, AuthVerdict, SignedRequest};
use crate::canonical::{add_canonicalization, echo_canonicalization, CanonicalError, CanonicalPayload};
use crate::crypto::{decode_signature, encode_signature, RequestSigner};
use crate::keystore::{KeyStore, KeyStoreError};
use crate::types::{AddRequest, EchoRequest, KeyId};

/// Attribute carrying the signer's key identifier
pub const KEY_ATTRIBUTE: &str = "key";

/// Attribute carrying the base64-encoded signature
pub const SIGNATURE_ATTRIBUTE: &str = "signature";

/// Faults while authenticating a call. Authentication failures are verdicts, not these.
#[derive(Debug, thiserror::Error)]
pub enum BindingError {
    #[error("Invalid request fields: {0}")]
    Canonical(#[from] CanonicalError),

    #[error(transparent)]
    KeyStore(#[from] KeyStoreError),
}

pub type BindingResult<T> = Result<T, BindingError>;

/// Out-of-band call attributes relevant to authentication
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CallAttributes {
    pub key: Option<KeyId>,
    pub signature: Option<String>,
}

impl CallAttributes {
    /// Pick the auth attributes out of arbitrary name/value pairs
    ///
    /// Names are matched case-insensitively; other attributes are ignored.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut attrs = Self::default();
        for (name, value) in pairs {
            let name = name.as_ref();
            if name.eq_ignore_ascii_case(KEY_ATTRIBUTE) {
                attrs.key = Some(value.into());
            } else if name.eq_ignore_ascii_case(SIGNATURE_ATTRIBUTE) {
                attrs.signature = Some(value.into());
            }
        }
        attrs
    }

    /// Name/value pairs to attach to an outgoing call
    pub fn to_pairs(&self) -> Vec<(&'static str, &str)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(key) = &self.key {
            pairs.push((KEY_ATTRIBUTE, key.as_str()));
        }
        if let Some(signature) = &self.signature {
            pairs.push((SIGNATURE_ATTRIBUTE, signature.as_str()));
        }
        pairs
    }

    pub fn is_empty(&self) -> bool {
        self.key.is_none() && self.signature.is_none()
    }
}

/// An Add call ready to send: plain body plus attributes
#[derive(Debug, Clone)]
pub struct SignedAdd {
    pub request: AddRequest,
    pub attributes: CallAttributes,
}

// ============ Client side ============

pub fn build_signed_echo(signer: &RequestSigner, message: impl Into<String>) -> EchoRequest {
    let message = message.into();
    let signature = signer.sign(&echo_canonicalization(&message));
    EchoRequest {
        message,
        public_key: Some(signer.key_id().to_string()),
        signature: Some(encode_signature(&signature)),
    }
}

pub fn build_signed_add(signer: &RequestSigner, a: f64, b: f64) -> BindingResult<SignedAdd> {
    let signature = signer.sign(&add_canonicalization(a, b)?);
    Ok(SignedAdd {
        request: AddRequest { a, b },
        attributes: CallAttributes {
            key: Some(signer.key_id().to_string()),
            signature: Some(encode_signature(&signature)),
        },
    })
}

// ============ Server side ============

pub fn authenticate_echo(store: &dyn KeyStore, request: &EchoRequest) -> BindingResult<AuthVerdict> {
    let payload = echo_canonicalization(&request.message);
    decode_and_verify(
        store,
        payload,
        request.public_key.as_deref(),
        request.signature.as_deref(),
    )
}

/// Authenticate an Add call against the operands actually received
///
/// `None` attributes means the call arrived without an attribute channel at all.
pub fn authenticate_add(
    store: &dyn KeyStore,
    request: &AddRequest,
    attributes: Option<&CallAttributes>,
) -> BindingResult<AuthVerdict> {
    let Some(attributes) = attributes else {
        return Ok(AuthVerdict::MissingCredentials);
    };
    if missing(attributes.key.as_deref()) || missing(attributes.signature.as_deref()) {
        return Ok(AuthVerdict::MissingCredentials);
    }

    let payload = add_canonicalization(request.a, request.b)?;
    decode_and_verify(
        store,
        payload,
        attributes.key.as_deref(),
        attributes.signature.as_deref(),
    )
}

fn missing(value: Option<&str>) -> bool {
    value.map_or(true, str::is_empty)
}

fn decode_and_verify(
    store: &dyn KeyStore,
    payload: CanonicalPayload,
    key_id: Option<&str>,
    signature: Option<&str>,
) -> BindingResult<AuthVerdict> {
    let (Some(key_id), Some(signature)) = (key_id, signature) else {
        return Ok(AuthVerdict::MissingCredentials);
    };
    if key_id.is_empty() || signature.is_empty() {
        return Ok(AuthVerdict::MissingCredentials);
    }

    let Ok(signature) = decode_signature(signature) else {
        return Ok(AuthVerdict::MalformedSignature);
    };

    let request = SignedRequest {
        payload,
        key_id: Some(key_id.to_string()),
        signature: Some(signature),
    };
    Ok(verify(store, &request)?)
}
