//! AES-256-GCM encryption for OAuth access and refresh tokens.
//!
//! This is the low-level primitive; callers that need to store an opaque
//! encrypted blob alongside a plaintext row (e.g. in the
//! `calendar_connections` table) should use [`EncryptionService::encrypt_to_string`]
//! and [`EncryptionService::decrypt_from_string`].

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use crate::error::{CommonError, CommonResult};

/// Encrypted payload, serialised as JSON then base64-encoded for storage in a
/// text column.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncryptedData {
    pub nonce: Vec<u8>,
    pub ciphertext: Vec<u8>,
    pub algorithm: String,
}

/// AES-256-GCM encryption service over a raw 32-byte key.
pub struct EncryptionService {
    cipher: Aes256Gcm,
}

impl std::fmt::Debug for EncryptionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionService").field("cipher", &"[REDACTED]").finish()
    }
}

impl EncryptionService {
    /// Create a new encryption service from a raw 32-byte key.
    ///
    /// # Errors
    /// Returns an error if `key` is not exactly 32 bytes.
    pub fn new(key: &[u8]) -> CommonResult<Self> {
        if key.len() != 32 {
            return Err(CommonError::internal("encryption key must be exactly 32 bytes"));
        }

        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| CommonError::internal(format!("failed to create cipher: {e}")))?;

        Ok(Self { cipher })
    }

    /// Generate a random 32-byte symmetric key.
    pub fn generate_key() -> Vec<u8> {
        let mut key = vec![0u8; 32];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    /// Encrypt bytes into an [`EncryptedData`] payload.
    ///
    /// # Errors
    /// Returns an error if the underlying AEAD operation fails.
    pub fn encrypt(&self, data: &[u8]) -> CommonResult<EncryptedData> {
        let nonce_bytes = Self::generate_nonce();
        let ciphertext = self
            .cipher
            .encrypt(&Nonce::from(nonce_bytes), data)
            .map_err(|e| CommonError::internal(format!("encryption failed: {e}")))?;

        Ok(EncryptedData {
            nonce: nonce_bytes.to_vec(),
            ciphertext,
            algorithm: "AES-256-GCM".to_string(),
        })
    }

    /// Decrypt an [`EncryptedData`] payload back into raw bytes.
    ///
    /// # Errors
    /// Returns an error if the algorithm tag is unrecognised, the nonce is
    /// malformed, or authentication fails.
    pub fn decrypt(&self, encrypted: &EncryptedData) -> CommonResult<Vec<u8>> {
        if encrypted.algorithm != "AES-256-GCM" {
            return Err(CommonError::internal(format!(
                "unsupported algorithm: {}",
                encrypted.algorithm
            )));
        }

        let nonce_array: [u8; 12] = encrypted
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| CommonError::internal("nonce must be exactly 12 bytes"))?;

        self.cipher
            .decrypt(&Nonce::from(nonce_array), encrypted.ciphertext.as_ref())
            .map_err(|e| CommonError::internal(format!("decryption failed: {e}")))
    }

    /// Encrypt bytes and encode the payload as a base64 string, ready for a
    /// text column.
    ///
    /// # Errors
    /// Returns an error if encryption or serialisation fails.
    pub fn encrypt_to_string(&self, data: &[u8]) -> CommonResult<String> {
        let encrypted = self.encrypt(data)?;
        let serialized = serde_json::to_vec(&encrypted)?;
        Ok(BASE64.encode(serialized))
    }

    /// Decode a base64 string and decrypt the contained payload.
    ///
    /// # Errors
    /// Returns an error if decoding, deserialisation, or decryption fails.
    pub fn decrypt_from_string(&self, encrypted_str: &str) -> CommonResult<Vec<u8>> {
        let decoded = BASE64
            .decode(encrypted_str)
            .map_err(|e| CommonError::internal(format!("base64 decode failed: {e}")))?;
        let encrypted: EncryptedData = serde_json::from_slice(&decoded)?;
        self.decrypt(&encrypted)
    }

    fn generate_nonce() -> [u8; 12] {
        let mut nonce = [0u8; 12];
        rand::thread_rng().fill_bytes(&mut nonce);
        nonce
    }
}

impl From<serde_json::Error> for CommonError {
    fn from(e: serde_json::Error) -> Self {
        Self::internal(format!("serialisation failed: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_key_has_correct_length() {
        let key = EncryptionService::generate_key();
        assert_eq!(key.len(), 32);
    }

    #[test]
    fn new_service_rejects_invalid_key_size() {
        let result = EncryptionService::new(&[0; 16]);
        assert!(result.is_err());
    }

    #[test]
    fn encrypt_and_decrypt_round_trip() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::new(&key).unwrap();

        let plaintext = b"refresh-token-value";
        let encrypted = service.encrypt(plaintext).unwrap();
        let decrypted = service.decrypt(&encrypted).unwrap();

        assert_eq!(decrypted, plaintext);
    }

    #[test]
    fn encrypt_to_and_from_string_round_trip() {
        let key = EncryptionService::generate_key();
        let service = EncryptionService::new(&key).unwrap();

        let plaintext = b"access-token-value";
        let encoded = service.encrypt_to_string(plaintext).unwrap();
        let decoded = service.decrypt_from_string(&encoded).unwrap();

        assert_eq!(decoded, plaintext);
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let service_a = EncryptionService::new(&EncryptionService::generate_key()).unwrap();
        let service_b = EncryptionService::new(&EncryptionService::generate_key()).unwrap();

        let encrypted = service_a.encrypt(b"secret").unwrap();
        assert!(service_b.decrypt(&encrypted).is_err());
    }
}
