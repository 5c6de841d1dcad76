//! Request canonicalization
//!
//! The canonical payload is the exact byte string that gets signed by the
//! client and re-derived by the server from the fields it actually received.
//! Both sides must produce identical bytes for logically equal requests.
//!
//! ## Rules (version 1)
//!
//! - **Echo**: the raw UTF-8 bytes of the message.
//! - **Add**: `a` and `b` formatted as shortest round-trippable decimals
//!   without exponent, joined by a single `,`.
//!
//! Any change to these rules is a breaking protocol change: signatures made
//! under an older rule no longer verify.

use std::fmt;

/// Version of the canonicalization rules implemented here.
pub const CANONICALIZATION_VERSION: u32 = 1;

/// Separator between numeric fields. A formatted `f64` never contains it.
pub const FIELD_SEPARATOR: char = ',';

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum CanonicalError {
    #[error("Field '{field}' is not a finite number")]
    NonFinite { field: &'static str },
}

pub type CanonicalResult<T> = Result<T, CanonicalError>;

/// Deterministic signing payload derived from a request's business fields
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CanonicalPayload(Vec<u8>);

impl CanonicalPayload {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for CanonicalPayload {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for CanonicalPayload {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for CanonicalPayload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}

/// Canonical payload of an Echo call: the message bytes, untouched
pub fn echo_canonicalization(message: &str) -> CanonicalPayload {
    CanonicalPayload(message.as_bytes().to_vec())
}

/// Canonical payload of an Add call: `"<a>,<b>"`
///
/// Non-finite operands are rejected rather than given a spelling.
pub fn add_canonicalization(a: f64, b: f64) -> CanonicalResult<CanonicalPayload> {
    let a = format_number("a", a)?;
    let b = format_number("b", b)?;
    Ok(CanonicalPayload(
        format!("{a}{FIELD_SEPARATOR}{b}").into_bytes(),
    ))
}

/// Shortest decimal that parses back to the same `f64`, never in exponent form.
///
/// `Display` for `f64` already has exactly these properties: `1.0` prints as
/// `1`, `0.1` as `0.1`, `1e21` as `1000000000000000000000`.
fn format_number(field: &'static str, value: f64) -> CanonicalResult<String> {
    if !value.is_finite() {
        return Err(CanonicalError::NonFinite { field });
    }
    Ok(value.to_string())
}
