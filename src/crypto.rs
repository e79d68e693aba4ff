//! Cryptography module for note locking
//!
//! Provides AES-256-GCM encryption with Argon2id key derivation.
//! Locked note content is encrypted with a user-provided password;
//! a fresh salt and nonce are generated for every call so identical
//! plaintext never produces identical ciphertext.

use crate::error::{AppError, Result};
use aes_gcm::{
    aead::{Aead, KeyInit, OsRng},
    Aes256Gcm, Nonce,
};
use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHasher};
use rand::RngCore;
use serde::{Deserialize, Serialize};

const SALT_SIZE: usize = 16; // 128 bits
const NONCE_SIZE: usize = 12; // 96 bits for GCM
const TAG_SIZE: usize = 16; // GCM authentication tag

/// Encrypted note content as persisted by the document store.
///
/// Produced only by this module; the store treats all three fields
/// as opaque byte sequences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CiphertextPayload {
    pub salt: Vec<u8>,
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
}

impl CiphertextPayload {
    /// Structural sanity check, independent of any password.
    ///
    /// A payload that fails this check is damaged or truncated; a payload
    /// that passes it but fails to decrypt was encrypted under a different
    /// password. The lock layer uses this to tell `WrongPassword` apart
    /// from `DecryptFailed`.
    pub fn is_well_formed(&self) -> bool {
        self.salt.len() >= SALT_SIZE
            && self.nonce.len() == NONCE_SIZE
            && self.ciphertext.len() >= TAG_SIZE
    }
}

/// Encrypt note content with AES-256-GCM under a password-derived key.
pub fn encrypt(plaintext: &str, password: &str) -> Result<CiphertextPayload> {
    // Fresh random salt per call, never reused
    let mut salt = vec![0u8; SALT_SIZE];
    OsRng.fill_bytes(&mut salt);

    let key = derive_key(password, &salt)?;

    // Fresh random nonce per call, never reused
    let mut nonce_bytes = vec![0u8; NONCE_SIZE];
    OsRng.fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| AppError::Crypto(format!("Cipher initialization failed: {}", e)))?;

    let ciphertext = cipher
        .encrypt(nonce, plaintext.as_bytes())
        .map_err(|e| AppError::Crypto(format!("Encryption failed: {}", e)))?;

    Ok(CiphertextPayload {
        salt,
        nonce: nonce_bytes,
        ciphertext,
    })
}

/// Decrypt a payload with the supplied password.
///
/// Fails with [`AppError::DecryptFailed`] when the authentication tag does
/// not verify (wrong password or corrupted payload) — never returns a
/// plausible-looking but wrong plaintext.
pub fn decrypt(payload: &CiphertextPayload, password: &str) -> Result<String> {
    if payload.nonce.len() != NONCE_SIZE {
        return Err(AppError::DecryptFailed);
    }

    let key = derive_key(password, &payload.salt)?;

    let nonce = Nonce::from_slice(&payload.nonce);

    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| AppError::Crypto(format!("Cipher initialization failed: {}", e)))?;

    let plaintext = cipher
        .decrypt(nonce, payload.ciphertext.as_ref())
        .map_err(|_| AppError::DecryptFailed)?;

    // Content was a &str at encrypt time; anything else means damage the
    // tag somehow failed to catch
    String::from_utf8(plaintext).map_err(|_| AppError::DecryptFailed)
}

/// Async wrapper around [`encrypt`] that runs key derivation on the
/// blocking thread pool, keeping the runtime responsive during the
/// intentionally expensive Argon2 derivation.
pub async fn encrypt_blocking(plaintext: String, password: String) -> Result<CiphertextPayload> {
    tokio::task::spawn_blocking(move || encrypt(&plaintext, &password))
        .await
        .map_err(|e| AppError::Crypto(format!("Encryption task failed: {}", e)))?
}

/// Async wrapper around [`decrypt`], see [`encrypt_blocking`].
pub async fn decrypt_blocking(payload: CiphertextPayload, password: String) -> Result<String> {
    tokio::task::spawn_blocking(move || decrypt(&payload, &password))
        .await
        .map_err(|e| AppError::Crypto(format!("Decryption task failed: {}", e)))?
}

/// Derive a 256-bit key from password and salt using Argon2id
fn derive_key(password: &str, salt: &[u8]) -> Result<Vec<u8>> {
    let argon2 = Argon2::default();

    // Convert salt to SaltString format
    let salt_string = SaltString::encode_b64(salt)
        .map_err(|e| AppError::Crypto(format!("Salt encoding failed: {}", e)))?;

    let password_hash = argon2
        .hash_password(password.as_bytes(), &salt_string)
        .map_err(|e| AppError::Crypto(format!("Key derivation failed: {}", e)))?;

    let hash = password_hash
        .hash
        .ok_or_else(|| AppError::Crypto("No hash generated".to_string()))?;

    // Argon2 produces a hash, we need exactly 32 bytes for AES-256
    let key_bytes = hash.as_bytes();
    if key_bytes.len() < 32 {
        return Err(AppError::Crypto("Derived key too short".to_string()));
    }

    Ok(key_bytes[..32].to_vec())
}
