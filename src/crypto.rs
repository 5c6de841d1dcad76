//! Cryptographic operations for request authentication
//!
//! Ed25519 signing and verification, key identifier derivation,
//! and decoding of transported key/signature material.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::{
    Signature, Signer, SigningKey, Verifier, VerifyingKey, KEYPAIR_LENGTH, PUBLIC_KEY_LENGTH,
    SIGNATURE_LENGTH,
};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalPayload;
use crate::types::KeyId;

/// Result type for crypto operations
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Crypto operation errors
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),
    #[error("Ed25519 signature must be 64 bytes, got {0}")]
    SignatureLength(usize),
    #[error("Base64 decode error: {0}")]
    Base64Error(#[from] base64::DecodeError),
}

/// Key identifier of a public key: base64 of its raw 32 bytes
pub fn key_id_for(key: &VerifyingKey) -> KeyId {
    BASE64.encode(key.as_bytes())
}

/// Short SHA256 fingerprint (hex) for log lines
pub fn fingerprint(key_id: &str) -> String {
    let digest = Sha256::digest(key_id.as_bytes());
    hex::encode(&digest[..8])
}

/// Parse a raw 32-byte Ed25519 public key
pub fn parse_public_key(bytes: &[u8]) -> CryptoResult<VerifyingKey> {
    let array: [u8; PUBLIC_KEY_LENGTH] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidPublicKey(format!(
            "Ed25519 key must be {} bytes, got {}",
            PUBLIC_KEY_LENGTH,
            bytes.len()
        ))
    })?;

    VerifyingKey::from_bytes(&array).map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))
}

/// Parse a base64-encoded public key, as found in `TRUSTED_KEYS` or key files
pub fn parse_public_key_b64(encoded: &str) -> CryptoResult<VerifyingKey> {
    let bytes = BASE64.decode(encoded.trim())?;
    parse_public_key(&bytes)
}

/// Parse a private key in 64-byte keypair form (secret followed by public)
///
/// Fails if the embedded public half does not belong to the secret half.
pub fn parse_private_key(bytes: &[u8]) -> CryptoResult<SigningKey> {
    let array: [u8; KEYPAIR_LENGTH] = bytes.try_into().map_err(|_| {
        CryptoError::InvalidPrivateKey(format!(
            "Ed25519 keypair must be {} bytes, got {}",
            KEYPAIR_LENGTH,
            bytes.len()
        ))
    })?;

    SigningKey::from_keypair_bytes(&array).map_err(|e| CryptoError::InvalidPrivateKey(e.to_string()))
}

/// Decode raw signature bytes into a fixed-length signature
pub fn parse_signature(bytes: &[u8]) -> CryptoResult<Signature> {
    let array: [u8; SIGNATURE_LENGTH] = bytes
        .try_into()
        .map_err(|_| CryptoError::SignatureLength(bytes.len()))?;
    Ok(Signature::from_bytes(&array))
}

/// Encode a signature for a text-only channel
pub fn encode_signature(signature: &Signature) -> String {
    BASE64.encode(signature.to_bytes())
}

/// Decode a base64 signature from a text-only channel (length is checked later)
pub fn decode_signature(encoded: &str) -> CryptoResult<Vec<u8>> {
    Ok(BASE64.decode(encoded)?)
}

/// Check a signature over a canonical payload
pub fn verify_payload(key: &VerifyingKey, payload: &CanonicalPayload, signature: &Signature) -> bool {
    key.verify(payload.as_bytes(), signature).is_ok()
}

/// Client-side signer
///
/// Owns the private key; the key never leaves this struct.
/// Ed25519 signing is deterministic, so the same payload always yields
/// the same signature.
pub struct RequestSigner {
    signing_key: SigningKey,
    key_id: KeyId,
}

impl RequestSigner {
    pub fn new(signing_key: SigningKey) -> Self {
        let key_id = key_id_for(&signing_key.verifying_key());
        Self { signing_key, key_id }
    }

    /// Identifier the server uses to look up our public key
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a canonical payload. Blind to what the payload means.
    pub fn sign(&self, payload: &CanonicalPayload) -> Signature {
        self.signing_key.sign(payload.as_bytes())
    }
}

impl std::fmt::Debug for RequestSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestSigner")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::{add_canonicalization, echo_canonicalization};
    use rand::rngs::OsRng;

    fn fixed_signer() -> RequestSigner {
        RequestSigner::new(SigningKey::from_bytes(&[7u8; 32]))
    }

    #[test]
    fn test_sign_verify() {
        let signer = RequestSigner::new(SigningKey::generate(&mut OsRng));
        let payload = echo_canonicalization("test message");

        let signature = signer.sign(&payload);
        assert!(verify_payload(&signer.verifying_key(), &payload, &signature));

        // Wrong message should fail
        let wrong = echo_canonicalization("wrong message");
        assert!(!verify_payload(&signer.verifying_key(), &wrong, &signature));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let signer = fixed_signer();
        let payload = add_canonicalization(1.0, 2.0).unwrap();
        assert_eq!(signer.sign(&payload), signer.sign(&payload));
        assert_eq!(signer.sign(&payload).to_bytes().len(), SIGNATURE_LENGTH);
    }

    #[test]
    fn test_key_id_is_base64_of_public_key() {
        let signer = fixed_signer();
        let key_id = signer.key_id().to_string();
        assert_eq!(key_id.len(), 44); // 32 bytes -> 44 base64 chars
        let parsed = parse_public_key_b64(&key_id).unwrap();
        assert_eq!(parsed, signer.verifying_key());
        assert_eq!(key_id_for(&parsed), key_id);
    }

    #[test]
    fn test_parse_public_key_rejects_bad_length() {
        assert!(matches!(
            parse_public_key(&[1u8; 31]),
            Err(CryptoError::InvalidPublicKey(_))
        ));
        assert!(parse_public_key_b64("not base64!").is_err());
    }

    #[test]
    fn test_parse_private_key_keypair_form() {
        let signing_key = SigningKey::from_bytes(&[9u8; 32]);
        let parsed = parse_private_key(&signing_key.to_keypair_bytes()).unwrap();
        assert_eq!(parsed.to_bytes(), signing_key.to_bytes());

        // Mismatched public half
        let mut bytes = signing_key.to_keypair_bytes();
        bytes[32..].copy_from_slice(SigningKey::from_bytes(&[1u8; 32]).verifying_key().as_bytes());
        assert!(parse_private_key(&bytes).is_err());
        assert!(parse_private_key(&[0u8; 32]).is_err());
    }

    #[test]
    fn test_parse_signature_length() {
        assert!(parse_signature(&[0u8; 64]).is_ok());
        assert!(matches!(
            parse_signature(&[0u8; 63]),
            Err(CryptoError::SignatureLength(63))
        ));
        assert!(parse_signature(&[]).is_err());
    }

    #[test]
    fn test_signature_encoding() {
        let signer = fixed_signer();
        let signature = signer.sign(&echo_canonicalization("hi"));
        let encoded = encode_signature(&signature);
        let decoded = decode_signature(&encoded).unwrap();
        assert_eq!(parse_signature(&decoded).unwrap(), signature);
        assert!(decode_signature("%%%").is_err());
    }

    #[test]
    fn test_fingerprint() {
        let fp = fingerprint("some-key-id");
        assert_eq!(fp.len(), 16);
        assert_eq!(fp, fingerprint("some-key-id"));
        assert_ne!(fp, fingerprint("other-key-id"));
    }

    #[test]
    fn test_debug_hides_private_key() {
        let signer = fixed_signer();
        let debug = format!("{:?}", signer);
        assert!(debug.contains(signer.key_id()));
        assert!(!debug.contains("signing_key"));
    }
}
