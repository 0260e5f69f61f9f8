//! Credential cipher: authenticated encryption for stored token values.
//!
//! `seal` produces a self-contained envelope: a fresh 16-byte salt and
//! 12-byte nonce are drawn per call, the cipher key is derived from the
//! master key and salt with Argon2id, and the value is encrypted with
//! AES-256-GCM. The envelope is `salt ‖ nonce ‖ ciphertext ‖ tag`,
//! base64-encoded, and is the only artifact that ever reaches disk.
//! `open` reverses the construction and fails closed: any malformed,
//! truncated, or tampered envelope (or wrong key) is a
//! [`CipherError::DecryptionFailed`], never partial plaintext.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use rand::Rng;
use thiserror::Error;
use zeroize::Zeroize;

pub const SALT_LEN: usize = 16;
pub const NONCE_LEN: usize = 12;
pub const TAG_LEN: usize = 16;

#[derive(Debug, Error)]
pub enum CipherError {
    /// The envelope is malformed, was tampered with, or the key is wrong.
    /// Carries no detail about which check failed.
    #[error("decryption failed")]
    DecryptionFailed,
    /// Key derivation or encryption could not run. Configuration-level
    /// failure, not retryable.
    #[error("encryption failed: {0}")]
    SealFailure(String),
}

/// Derives a one-envelope AES-256 key from the master key and salt.
fn derive_key(master_key: &[u8], salt: &[u8]) -> Result<[u8; 32], CipherError> {
    let mut key = [0u8; 32];
    Argon2::default()
        .hash_password_into(master_key, salt, &mut key)
        .map_err(|e| CipherError::SealFailure(format!("key derivation error: {e}")))?;
    Ok(key)
}

/// Encrypts `plaintext` under `master_key` into an opaque envelope.
pub fn seal(plaintext: &str, master_key: &[u8]) -> Result<String, CipherError> {
    let salt: [u8; SALT_LEN] = rand::rng().random();
    let nonce: [u8; NONCE_LEN] = rand::rng().random();

    let mut key = derive_key(master_key, &salt)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let encrypted = cipher.encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes());
    key.zeroize();

    let ciphertext =
        encrypted.map_err(|e| CipherError::SealFailure(format!("cipher error: {e}")))?;

    let mut blob = Vec::with_capacity(SALT_LEN + NONCE_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend(ciphertext);
    Ok(BASE64.encode(blob))
}

/// Decrypts an envelope produced by [`seal`].
pub fn open(envelope: &str, master_key: &[u8]) -> Result<String, CipherError> {
    let blob = BASE64
        .decode(envelope)
        .map_err(|_| CipherError::DecryptionFailed)?;
    if blob.len() < SALT_LEN + NONCE_LEN + TAG_LEN {
        return Err(CipherError::DecryptionFailed);
    }

    let (salt, rest) = blob.split_at(SALT_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let mut key = derive_key(master_key, salt).map_err(|_| CipherError::DecryptionFailed)?;
    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
    let decrypted = cipher.decrypt(Nonce::from_slice(nonce), ciphertext);
    key.zeroize();

    let plaintext = decrypted.map_err(|_| CipherError::DecryptionFailed)?;
    String::from_utf8(plaintext).map_err(|_| CipherError::DecryptionFailed)
}
