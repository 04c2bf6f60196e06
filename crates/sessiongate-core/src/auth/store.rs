use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use argon2::Argon2;
use chacha20poly1305::{
    aead::{Aead, KeyInit, Payload},
    ChaCha20Poly1305, Key, Nonce,
};
use rand::{rngs::OsRng, RngCore};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use super::SessionToken;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.bin";

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;

/// Binds ciphertexts to this file format.
const SESSION_AAD: &[u8] = b"sessiongate-session:v1";

/// Persists the session token sealed with a key derived from the session
/// secret. File layout: `salt (16) || nonce (12) || ciphertext`.
pub struct SessionStore {
    cache_dir: PathBuf,
    secret: SecretString,
}

impl SessionStore {
    pub fn new(cache_dir: PathBuf, secret: SecretString) -> Self {
        Self { cache_dir, secret }
    }

    /// Load the stored token. A missing file means no session.
    pub fn load(&self) -> Result<Option<SessionToken>> {
        let path = self.session_path();
        if !path.exists() {
            return Ok(None);
        }

        let sealed = std::fs::read(&path)
            .with_context(|| format!("Failed to read session file {}", path.display()))?;
        let plaintext = open(&self.secret, &sealed).context("Failed to unseal session file")?;
        let token: SessionToken =
            serde_json::from_slice(&plaintext).context("Failed to parse session file")?;

        debug!(path = %path.display(), "Loaded session token");
        Ok(Some(token))
    }

    /// Save the token, replacing any previous one
    pub fn save(&self, token: &SessionToken) -> Result<()> {
        let path = self.session_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let plaintext = serde_json::to_vec(token)?;
        let sealed = seal(&self.secret, &plaintext)?;
        write_private(&path, &sealed)
            .with_context(|| format!("Failed to write session file {}", path.display()))?;
        Ok(())
    }

    /// Clear session data
    pub fn clear(&self) -> Result<()> {
        let path = self.session_path();
        if path.exists() {
            std::fs::remove_file(path)?;
        }
        Ok(())
    }

    fn session_path(&self) -> PathBuf {
        self.cache_dir.join(SESSION_FILE)
    }
}

#[cfg(unix)]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(contents)
}

#[cfg(not(unix))]
fn write_private(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, contents)
}

fn derive_key(secret: &SecretString, salt: &[u8]) -> Result<[u8; KEY_LEN]> {
    let mut key = [0u8; KEY_LEN];
    Argon2::default()
        .hash_password_into(secret.expose_secret().as_bytes(), salt, &mut key)
        .map_err(|e| anyhow::anyhow!("Key derivation failure: {e}"))?;
    Ok(key)
}

fn seal(secret: &SecretString, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce_bytes = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut salt);
    OsRng.fill_bytes(&mut nonce_bytes);

    let key = derive_key(secret, &salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let payload = Payload {
        msg: plaintext,
        aad: SESSION_AAD,
    };
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce_bytes), payload)
        .map_err(|e| anyhow::anyhow!("Encryption failure: {e}"))?;

    let mut sealed = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    sealed.extend_from_slice(&salt);
    sealed.extend_from_slice(&nonce_bytes);
    sealed.extend_from_slice(&ciphertext);
    Ok(sealed)
}

fn open(secret: &SecretString, sealed: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < SALT_LEN + NONCE_LEN {
        return Err(anyhow::anyhow!("Invalid sealed session length"));
    }
    let (salt, rest) = sealed.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let key = derive_key(secret, salt)?;
    let cipher = ChaCha20Poly1305::new(Key::from_slice(&key));
    let payload = Payload {
        msg: ciphertext,
        aad: SESSION_AAD,
    };
    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), payload)
        .map_err(|e| anyhow::anyhow!("Decryption failure: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenBundle;
    use chrono::Utc;

    fn store_in(dir: &Path, secret: &str) -> SessionStore {
        SessionStore::new(dir.to_path_buf(), SecretString::from(secret.to_string()))
    }

    #[test]
    fn test_missing_file_is_no_session() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(store_in(dir.path(), "secret").load().unwrap(), None);
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), "secret");
        let token = SessionToken::Active(TokenBundle::issue("A1", "R1", 3600, Utc::now()));

        store.save(&token).unwrap();
        let raw = std::fs::read(dir.path().join(SESSION_FILE)).unwrap();
        assert!(!String::from_utf8_lossy(&raw).contains("R1"));

        // Millisecond precision on disk
        let loaded = store.load().unwrap().unwrap();
        assert_eq!(loaded.access_token(), Some("A1"));

        store.save(&SessionToken::refresh_failed()).unwrap();
        assert_eq!(store.load().unwrap(), Some(SessionToken::refresh_failed()));
    }

    #[test]
    fn test_wrong_secret_fails() {
        let dir = tempfile::tempdir().unwrap();
        store_in(dir.path(), "secret")
            .save(&SessionToken::refresh_failed())
            .unwrap();
        assert!(store_in(dir.path(), "other").load().is_err());
    }

    #[test]
    fn test_tampered_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), "secret");
        store.save(&SessionToken::refresh_failed()).unwrap();

        let path = dir.path().join(SESSION_FILE);
        let mut sealed = std::fs::read(&path).unwrap();
        let last = sealed.len() - 1;
        sealed[last] ^= 0x01;
        std::fs::write(&path, sealed).unwrap();

        assert!(store.load().is_err());
    }

    #[test]
    fn test_truncated_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(SESSION_FILE), [0u8; 10]).unwrap();
        assert!(store_in(dir.path(), "secret").load().is_err());
    }

    #[test]
    fn test_clear_removes_session() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path(), "secret");
        store.save(&SessionToken::refresh_failed()).unwrap();
        store.clear().unwrap();
        assert_eq!(store.load().unwrap(), None);
        store.clear().unwrap();
    }
}
