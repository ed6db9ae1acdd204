use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use sha2::{Digest, Sha256};

use crate::error::{AppError, AppResult};

/// Placeholder returned instead of an encrypted variable's value
pub const MASKED_VALUE: &str = "******";

const NONCE_LEN: usize = 12;

/// Encrypts variable values at rest with AES-256-GCM.
///
/// The key is derived from the configured secret; a stored token is the
/// base64 of `nonce || ciphertext`, kept as a JSON string in the value
/// column.
#[derive(Clone)]
pub struct ValueCipher {
    key: [u8; 32],
}

impl ValueCipher {
    pub fn new(secret: &str) -> Self {
        let key: [u8; 32] = Sha256::digest(secret.as_bytes()).into();
        Self { key }
    }

    /// Encrypt a JSON value into an opaque token
    pub fn encrypt_value(&self, value: &serde_json::Value) -> AppResult<serde_json::Value> {
        let plaintext = serde_json::to_vec(value)
            .map_err(|e| AppError::Internal(format!("value serialization failed: {}", e)))?;

        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let ciphertext = self
            .cipher()
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| AppError::Internal("value encryption failed".to_string()))?;

        let mut raw = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        raw.extend_from_slice(&nonce);
        raw.extend_from_slice(&ciphertext);

        Ok(serde_json::Value::String(STANDARD.encode(raw)))
    }

    /// Decrypt a stored token back into the original JSON value
    pub fn decrypt_value(&self, stored: &serde_json::Value) -> AppResult<serde_json::Value> {
        let token = stored.as_str().ok_or_else(|| {
            AppError::Internal("encrypted variable does not hold a string token".to_string())
        })?;

        let raw = STANDARD
            .decode(token)
            .map_err(|e| AppError::Internal(format!("malformed encrypted token: {}", e)))?;
        if raw.len() <= NONCE_LEN {
            return Err(AppError::Internal("encrypted token too short".to_string()));
        }

        let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
        let plaintext = self
            .cipher()
            .decrypt(Nonce::from_slice(nonce), ciphertext)
            .map_err(|_| AppError::Internal("value decryption failed".to_string()))?;

        serde_json::from_slice(&plaintext)
            .map_err(|e| AppError::Internal(format!("decrypted value is not JSON: {}", e)))
    }

    fn cipher(&self) -> Aes256Gcm {
        let key = Key::<Aes256Gcm>::from(self.key);
        Aes256Gcm::new(&key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn round_trips_structured_values() {
        let cipher = ValueCipher::new("a-secret-for-tests");
        let value = json!({"token": "abc", "ttl": 30, "tags": ["a", "b"]});

        let stored = cipher.encrypt_value(&value).unwrap();
        assert!(stored.is_string());
        assert_ne!(stored, value);

        let restored = cipher.decrypt_value(&stored).unwrap();
        assert_eq!(restored, value);
    }

    #[test]
    fn distinct_tokens_for_identical_values() {
        let cipher = ValueCipher::new("a-secret-for-tests");
        let value = json!("same");

        let a = cipher.encrypt_value(&value).unwrap();
        let b = cipher.encrypt_value(&value).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_token_from_other_secret() {
        let value = json!("classified");
        let stored = ValueCipher::new("secret-one").encrypt_value(&value).unwrap();

        let err = ValueCipher::new("secret-two").decrypt_value(&stored);
        assert!(err.is_err());
    }
}
