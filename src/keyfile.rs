//! Key pair files
//!
//! Each file holds one base64 line: the 32-byte public key, or the 64-byte
//! keypair form (secret followed by public) for the private key.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;

use crate::crypto::{parse_private_key, parse_public_key, CryptoError};

#[derive(Debug, thiserror::Error)]
pub enum KeyFileError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("Invalid key in {path}: {source}")]
    Key {
        path: String,
        #[source]
        source: CryptoError,
    },
    #[error("Public key in {0} does not match the private key")]
    Mismatch(String),
    #[error("Key file {0} already exists")]
    Exists(String),
}

pub type KeyFileResult<T> = Result<T, KeyFileError>;

/// Write a key pair, creating the directory if needed
///
/// Refuses with [`KeyFileError::Exists`] if either file is already there,
/// so an existing key is never overwritten or paired with a new one.
/// The private key file is readable by its owner only.
pub fn save_key_pair(key: &SigningKey, public_path: &Path, private_path: &Path) -> KeyFileResult<()> {
    for path in [public_path, private_path] {
        if path.exists() {
            return Err(KeyFileError::Exists(path.display().to_string()));
        }
    }

    write_new(public_path, &BASE64.encode(key.verifying_key().as_bytes()), false)?;
    if let Err(e) = write_new(private_path, &BASE64.encode(key.to_keypair_bytes()), true) {
        // Don't leave half a pair behind
        if let Err(remove) = fs::remove_file(public_path) {
            tracing::warn!("Failed to remove {}: {}", public_path.display(), remove);
        }
        return Err(e);
    }
    Ok(())
}

/// Read a key pair written by [`save_key_pair`]
pub fn load_key_pair(public_path: &Path, private_path: &Path) -> KeyFileResult<SigningKey> {
    let public_bytes = read_b64(public_path)?;
    let private_bytes = read_b64(private_path)?;

    let public = parse_public_key(&public_bytes).map_err(|source| KeyFileError::Key {
        path: public_path.display().to_string(),
        source,
    })?;
    let signing_key = parse_private_key(&private_bytes).map_err(|source| KeyFileError::Key {
        path: private_path.display().to_string(),
        source,
    })?;

    if signing_key.verifying_key() != public {
        return Err(KeyFileError::Mismatch(public_path.display().to_string()));
    }
    Ok(signing_key)
}

/// Load the key pair, or generate and save a fresh one if neither file exists
///
/// A half-present or corrupt pair is an error rather than silently replaced.
pub fn load_or_generate(public_path: &Path, private_path: &Path) -> KeyFileResult<SigningKey> {
    if !public_path.exists() && !private_path.exists() {
        tracing::warn!(
            "No key pair at {}, generating a new one",
            public_path.display()
        );
        let key = SigningKey::generate(&mut OsRng);
        save_key_pair(&key, public_path, private_path)?;
        return Ok(key);
    }
    load_key_pair(public_path, private_path)
}

/// Create `path` exclusively; fails if something else created it first
fn write_new(path: &Path, contents: &str, private: bool) -> KeyFileResult<()> {
    let io_err = |source| KeyFileError::Io {
        path: path.display().to_string(),
        source,
    };

    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(io_err)?;
    }

    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    if private {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    #[cfg(not(unix))]
    let _ = private;

    let mut file = options.open(path).map_err(|source| match source.kind() {
        io::ErrorKind::AlreadyExists => KeyFileError::Exists(path.display().to_string()),
        _ => io_err(source),
    })?;
    file.write_all(contents.as_bytes()).map_err(io_err)
}

fn read_b64(path: &Path) -> KeyFileResult<Vec<u8>> {
    let contents = fs::read_to_string(path).map_err(|source| KeyFileError::Io {
        path: path.display().to_string(),
        source,
    })?;
    BASE64
        .decode(contents.trim())
        .map_err(|e| KeyFileError::Key {
            path: path.display().to_string(),
            source: CryptoError::from(e),
        })
}
