//! Symmetric encryption for secrets stored in the database
//!
//! AES-256-GCM with a random 12-byte nonce per message. The stored form is
//! `base64(nonce || ciphertext)`. The key is the SHA-256 of the configured
//! server secret, so any secret length yields a 256-bit key.

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use thiserror::Error;

use super::crypto::sha256;

const NONCE_LEN: usize = 12;

#[derive(Error, Debug)]
pub enum EncryptionError {
    #[error("Encryption failed")]
    Encrypt,
    #[error("Stored secret is not valid base64: {0}")]
    Encoding(#[from] base64::DecodeError),
    #[error("Stored secret is too short")]
    Truncated,
    #[error("Decryption failed (wrong secret or corrupted data)")]
    Decrypt,
    #[error("Decrypted secret is not valid UTF-8")]
    Utf8(#[from] std::string::FromUtf8Error),
}

#[derive(Clone)]
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl EncryptionService {
    /// Derive the cipher key from a server secret
    pub fn from_secret(secret: &str) -> Self {
        let digest = sha256(secret.as_bytes());
        let key = Key::<Aes256Gcm>::from_slice(&digest);
        Self {
            cipher: Aes256Gcm::new(key),
        }
    }

    pub fn encrypt(&self, plaintext: &str) -> Result<String, EncryptionError> {
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher
            .encrypt(&nonce, plaintext.as_bytes())
            .map_err(|_| EncryptionError::Encrypt)?;

        let mut combined = nonce.to_vec();
        combined.extend_from_slice(&ciphertext);
        Ok(STANDARD.encode(combined))
    }

    pub fn decrypt(&self, encrypted: &str) -> Result<String, EncryptionError> {
        let combined = STANDARD.decode(encrypted)?;
        if combined.len() <= NONCE_LEN {
            return Err(EncryptionError::Truncated);
        }

        let (nonce, ciphertext) = combined.split_at(NONCE_LEN);
        let plaintext = self
            .cipher
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| EncryptionError::Decrypt)?;

        Ok(String::from_utf8(plaintext)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decrypts_what_it_encrypts() {
        let service = EncryptionService::from_secret("a-long-enough-server-secret");
        let encrypted = service.encrypt("sk-test-1234").unwrap();

        assert!(!encrypted.contains("sk-test"));
        assert_eq!(service.decrypt(&encrypted).unwrap(), "sk-test-1234");
    }

    #[test]
    fn test_nonce_is_random() {
        let service = EncryptionService::from_secret("secret");
        assert_ne!(service.encrypt("same").unwrap(), service.encrypt("same").unwrap());
    }

    #[test]
    fn test_wrong_secret_fails() {
        let encrypted = EncryptionService::from_secret("one")
            .encrypt("sk-test")
            .unwrap();
        let err = EncryptionService::from_secret("two")
            .decrypt(&encrypted)
            .unwrap_err();
        assert!(matches!(err, EncryptionError::Decrypt));
    }

    #[test]
    fn test_malformed_input() {
        let service = EncryptionService::from_secret("secret");
        assert!(matches!(
            service.decrypt("not base64!"),
            Err(EncryptionError::Encoding(_))
        ));
        assert!(matches!(
            service.decrypt(&STANDARD.encode([0u8; 8])),
            Err(EncryptionError::Truncated)
        ));
    }
}
