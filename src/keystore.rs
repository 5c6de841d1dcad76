//! Trusted key store
//!
//! Maps key identifiers to the public keys the server accepts as signers.
//! Keys enter the store only through an explicit `put`; nothing is trusted
//! on first use and nothing expires.

use dashmap::DashMap;
use ed25519_dalek::VerifyingKey;

use crate::crypto::key_id_for;
use crate::types::KeyId;

#[derive(Debug, thiserror::Error)]
pub enum KeyStoreError {
    /// The caller's key is not trusted. A normal outcome, not a fault.
    #[error("Unknown key: {0}")]
    UnknownKey(KeyId),

    /// The backing store itself failed.
    #[error("Key store backend error: {0}")]
    Backend(String),
}

pub type KeyStoreResult<T> = Result<T, KeyStoreError>;

/// Anything that can resolve and record trusted public keys
///
/// Implementations must be safe to call from many in-flight handlers at once.
pub trait KeyStore: Send + Sync {
    /// Look up a trusted key. Absent keys yield [`KeyStoreError::UnknownKey`].
    fn get(&self, id: &str) -> KeyStoreResult<VerifyingKey>;

    /// Trust `key` under `id`. Overwrites any previous key (last write wins).
    fn put(&self, id: KeyId, key: VerifyingKey) -> KeyStoreResult<()>;

    /// Number of trusted keys, if the backend can count them cheaply
    fn trusted_count(&self) -> Option<usize> {
        None
    }
}

/// In-memory trusted key store
///
/// Sharded map: lookups from concurrent handlers do not serialize behind
/// one another, writes lock only their shard.
#[derive(Debug, Default)]
pub struct TrustedKeyStore {
    keys: DashMap<KeyId, VerifyingKey>,
}

impl TrustedKeyStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store trusting each key under its derived identifier
    pub fn with_keys(keys: impl IntoIterator<Item = VerifyingKey>) -> Self {
        let store = Self::new();
        for key in keys {
            store.trust(key);
        }
        store
    }

    /// Trust a key under its derived identifier, returning that identifier
    pub fn trust(&self, key: VerifyingKey) -> KeyId {
        let id = key_id_for(&key);
        self.keys.insert(id.clone(), key);
        id
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyStore for TrustedKeyStore {
    fn get(&self, id: &str) -> KeyStoreResult<VerifyingKey> {
        self.keys
            .get(id)
            .map(|r| *r.value())
            .ok_or_else(|| KeyStoreError::UnknownKey(id.to_string()))
    }

    fn put(&self, id: KeyId, key: VerifyingKey) -> KeyStoreResult<()> {
        if self.keys.insert(id.clone(), key).is_some() {
            tracing::info!(key = %crate::crypto::fingerprint(&id), "Replaced trusted key");
        } else {
            tracing::info!(key = %crate::crypto::fingerprint(&id), "Trusted new key");
        }
        Ok(())
    }

    fn trusted_count(&self) -> Option<usize> {
        Some(self.len())
    }
}
