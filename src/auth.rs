//! Request verification
//!
//! Every call is authenticated before its handler runs: the claimed key must
//! be trusted and the signature must cover the canonical payload the server
//! derived from the fields it received.
//!
//! Verdicts are for server-side logs and tests. Callers only ever learn
//! "unauthenticated"; the API layer does that collapsing.

use std::fmt;

use crate::canonical::CanonicalPayload;
use crate::crypto::{fingerprint, parse_signature, verify_payload};
use crate::keystore::{KeyStore, KeyStoreError};
use crate::types::KeyId;

/// Outcome of authenticating one call. Computed per call, never cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthVerdict {
    Authenticated,
    UnknownKey,
    InvalidSignature,
    MalformedSignature,
    MissingCredentials,
}

impl AuthVerdict {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthVerdict::Authenticated)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AuthVerdict::Authenticated => "authenticated",
            AuthVerdict::UnknownKey => "unknown_key",
            AuthVerdict::InvalidSignature => "invalid_signature",
            AuthVerdict::MalformedSignature => "malformed_signature",
            AuthVerdict::MissingCredentials => "missing_credentials",
        }
    }
}

impl fmt::Display for AuthVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A call's payload with the credentials its transport carried, already decoded
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub payload: CanonicalPayload,
    pub key_id: Option<KeyId>,
    /// Raw signature bytes, length not yet checked
    pub signature: Option<Vec<u8>>,
}

/// Verify a signed request against the trusted key store
///
/// Checks run in order and stop at the first failure:
/// missing credentials, malformed signature, unknown key, bad signature.
///
/// `Err` means the store itself failed and is never an authentication verdict.
pub fn verify(store: &dyn KeyStore, request: &SignedRequest) -> Result<AuthVerdict, KeyStoreError> {
    let (Some(key_id), Some(signature)) = (&request.key_id, &request.signature) else {
        return Ok(AuthVerdict::MissingCredentials);
    };

    let Ok(signature) = parse_signature(signature) else {
        return Ok(AuthVerdict::MalformedSignature);
    };

    let public_key = match store.get(key_id) {
        Ok(key) => key,
        Err(KeyStoreError::UnknownKey(_)) => return Ok(AuthVerdict::UnknownKey),
        Err(e) => return Err(e),
    };

    if !verify_payload(&public_key, &request.payload, &signature) {
        return Ok(AuthVerdict::InvalidSignature);
    }

    tracing::debug!(key = %fingerprint(key_id), "Request authenticated");
    Ok(AuthVerdict::Authenticated)
}

#[cfg(test)]
mod tests {
    use ed25519_dalek::SigningKey;

    use super::*;
    use crate::canonical::{add_canonicalization, echo_canonicalization};
    use crate::crypto::RequestSigner;
    use crate::keystore::{KeyStoreResult, TrustedKeyStore};

    fn signer(seed: u8) -> RequestSigner {
        RequestSigner::new(SigningKey::from_bytes(&[seed; 32]))
    }

    fn signed(signer: &RequestSigner, payload: CanonicalPayload) -> SignedRequest {
        let signature = signer.sign(&payload).to_bytes().to_vec();
        SignedRequest {
            payload,
            key_id: Some(signer.key_id().to_string()),
            signature: Some(signature),
        }
    }

    fn store_for(signer: &RequestSigner) -> TrustedKeyStore {
        TrustedKeyStore::with_keys([signer.verifying_key()])
    }

    #[test]
    fn test_round_trip_authenticated() {
        let s = signer(1);
        let req = signed(&s, add_canonicalization(1.0, 2.0).unwrap());
        assert_eq!(verify(&store_for(&s), &req).unwrap(), AuthVerdict::Authenticated);
    }

    #[test]
    fn test_missing_key_id() {
        let s = signer(1);
        let mut req = signed(&s, echo_canonicalization("hi"));
        req.key_id = None;
        assert_eq!(verify(&store_for(&s), &req).unwrap(), AuthVerdict::MissingCredentials);
    }

    #[test]
    fn test_missing_signature() {
        let s = signer(1);
        let mut req = signed(&s, echo_canonicalization("hi"));
        req.signature = None;
        assert_eq!(verify(&store_for(&s), &req).unwrap(), AuthVerdict::MissingCredentials);
    }

    #[test]
    fn test_missing_checked_before_store() {
        let req = SignedRequest {
            payload: echo_canonicalization("hi"),
            key_id: None,
            signature: None,
        };
        assert_eq!(
            verify(&TrustedKeyStore::new(), &req).unwrap(),
            AuthVerdict::MissingCredentials
        );
    }

    #[test]
    fn test_malformed_signature_before_lookup() {
        let s = signer(1);
        let mut req = signed(&s, echo_canonicalization("hi"));
        req.signature = Some(vec![0u8; 10]);
        // Empty store: the length check still wins over UnknownKey
        assert_eq!(
            verify(&TrustedKeyStore::new(), &req).unwrap(),
            AuthVerdict::MalformedSignature
        );
    }

    #[test]
    fn test_untrusted_key() {
        let s = signer(1);
        let req = signed(&s, echo_canonicalization("hi"));
        assert_eq!(verify(&TrustedKeyStore::new(), &req).unwrap(), AuthVerdict::UnknownKey);
        assert_eq!(verify(&store_for(&signer(2)), &req).unwrap(), AuthVerdict::UnknownKey);
    }

    #[test]
    fn test_key_id_of_other_trusted_key() {
        // Signed by 1, claims to be 2, and 2 is trusted
        let s1 = signer(1);
        let s2 = signer(2);
        let mut req = signed(&s1, echo_canonicalization("hi"));
        req.key_id = Some(s2.key_id().to_string());
        assert_eq!(verify(&store_for(&s2), &req).unwrap(), AuthVerdict::InvalidSignature);
    }

    #[test]
    fn test_tampered_payload() {
        let s = signer(1);
        let mut req = signed(&s, add_canonicalization(1.0, 2.0).unwrap());
        req.payload = add_canonicalization(1.0, 3.0).unwrap();
        assert_eq!(verify(&store_for(&s), &req).unwrap(), AuthVerdict::InvalidSignature);
    }

    struct FailingStore;

    impl KeyStore for FailingStore {
        fn get(&self, _id: &str) -> KeyStoreResult<ed25519_dalek::VerifyingKey> {
            Err(KeyStoreError::Backend("connection refused".into()))
        }

        fn put(&self, _id: KeyId, _key: ed25519_dalek::VerifyingKey) -> KeyStoreResult<()> {
            Err(KeyStoreError::Backend("connection refused".into()))
        }
    }

    #[test]
    fn test_backend_fault_is_not_a_verdict() {
        let s = signer(1);
        let req = signed(&s, echo_canonicalization("hi"));
        assert!(matches!(verify(&FailingStore, &req), Err(KeyStoreError::Backend(_))));
    }

    mod proptests {
        use proptest::prelude::*;

        use super::*;

        proptest! {
            /// Any payload signed by a trusted key verifies.
            #[test]
            fn signed_payload_verifies(seed in any::<[u8; 32]>(), payload in proptest::collection::vec(any::<u8>(), 0..256)) {
                let s = RequestSigner::new(SigningKey::from_bytes(&seed));
                let req = signed(&s, CanonicalPayload::from(payload));
                prop_assert_eq!(verify(&store_for(&s), &req).unwrap(), AuthVerdict::Authenticated);
            }

            /// Flipping any single payload byte breaks the signature.
            #[test]
            fn flipped_payload_byte_rejected(payload in proptest::collection::vec(any::<u8>(), 1..128),
                                             index in any::<prop::sample::Index>(),
                                             mask in 1u8..=255) {
                let s = signer(3);
                let mut req = signed(&s, CanonicalPayload::from(payload.clone()));
                let mut tampered = payload;
                let i = index.index(tampered.len());
                tampered[i] ^= mask;
                req.payload = CanonicalPayload::from(tampered);
                prop_assert_eq!(verify(&store_for(&s), &req).unwrap(), AuthVerdict::InvalidSignature);
            }

            /// Flipping any single signature byte breaks the signature.
            #[test]
            fn flipped_signature_byte_rejected(payload in proptest::collection::vec(any::<u8>(), 0..128),
                                               index in 0usize..64,
                                               mask in 1u8..=255) {
                let s = signer(4);
                let mut req = signed(&s, CanonicalPayload::from(payload));
                if let Some(sig) = req.signature.as_mut() {
                    sig[index] ^= mask;
                }
                prop_assert_eq!(verify(&store_for(&s), &req).unwrap(), AuthVerdict::InvalidSignature);
            }
        }
    }
}
