//! Secret encryption for credential vaults.
//!
//! Vault secrets are encrypted at rest with AES-256-GCM. The 256-bit key is
//! the SHA-256 digest of the configured application secret, and the stored
//! form is `base64(nonce || ciphertext)` with a random 96-bit nonce.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::CoreError;

/// AES-GCM nonce length in bytes.
const NONCE_LEN: usize = 12;

/// Encrypts and decrypts vault secrets with a key derived from the
/// application secret.
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    pub fn new(app_secret: &str) -> Self {
        let key = Sha256::digest(app_secret.as_bytes());
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        Self { cipher }
    }

    /// Seal a plaintext secret into the stored base64 form.
    pub fn encrypt(&self, plaintext: &str) -> Result<String, CoreError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| CoreError::Internal("vault encryption failed".into()))?;

        let mut data = Vec::with_capacity(NONCE_LEN + sealed.len());
        data.extend_from_slice(&nonce);
        data.extend_from_slice(&sealed);
        Ok(BASE64.encode(data))
    }

    /// Open a stored base64 ciphertext back into the plaintext secret.
    pub fn decrypt(&self, encoded: &str) -> Result<String, CoreError> {
        let data = BASE64
            .decode(encoded)
            .map_err(|e| CoreError::Internal(format!("vault ciphertext is not valid base64: {e}")))?;
        if data.len() < NONCE_LEN {
            return Err(CoreError::Internal("vault ciphertext too short".into()));
        }

        let (nonce, sealed) = data.split_at(NONCE_LEN);
        let plain = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), sealed)
            .map_err(|_| CoreError::Internal("vault decryption failed".into()))?;
        String::from_utf8(plain)
            .map_err(|_| CoreError::Internal("decrypted vault secret is not valid UTF-8".into()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
