//! AES-256-GCM wrapper around the master key.
//!
//! Stored payloads are `base64(nonce ‖ ciphertext)` with a fresh
//! 12-byte random nonce per encryption.

use aes_gcm::aead::Aead;
use aes_gcm::{Aes256Gcm, Key, KeyInit, Nonce};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use cap_core::{CapabilityError, CapabilityResult};
use rand::RngCore;

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 12;

/// Symmetric cipher for secret values at rest.
#[derive(Clone)]
pub struct SecretCipher {
    cipher: Aes256Gcm,
}

impl SecretCipher {
    /// Builds a cipher from a base64-encoded master key. Fails unless
    /// the decoded key is exactly 32 bytes.
    pub fn from_base64_key(encoded: &str) -> CapabilityResult<Self> {
        let bytes = B64
            .decode(encoded.trim())
            .map_err(|e| CapabilityError::invalid(format!("master key is not base64: {e}")))?;
        if bytes.len() != KEY_LEN {
            return Err(CapabilityError::invalid(format!(
                "master key must decode to {KEY_LEN} bytes, got {}",
                bytes.len()
            )));
        }
        let key = Key::<Aes256Gcm>::from_slice(&bytes);
        Ok(Self {
            cipher: Aes256Gcm::new(key),
        })
    }

    /// Encrypts a plaintext, returning the base64 payload stored at rest.
    pub fn encrypt(&self, plaintext: &str) -> CapabilityResult<String> {
        let mut nonce_bytes = [0u8; NONCE_LEN];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = self
            .cipher
            .encrypt(nonce, plaintext.as_bytes())
            .map_err(|_| CapabilityError::internal("secret encryption failed"))?;
        let mut payload = Vec::with_capacity(NONCE_LEN + ciphertext.len());
        payload.extend_from_slice(&nonce_bytes);
        payload.extend_from_slice(&ciphertext);
        Ok(B64.encode(payload))
    }

    /// Decrypts a payload produced by [`SecretCipher::encrypt`].
    pub fn decrypt(&self, encoded: &str) -> CapabilityResult<String> {
        let payload = B64
            .decode(encoded)
            .map_err(|e| CapabilityError::internal(format!("stored secret is not base64: {e}")))?;
        if payload.len() < NONCE_LEN {
            return Err(CapabilityError::internal("stored secret is truncated"));
        }
        let (nonce_bytes, ciphertext) = payload.split_at(NONCE_LEN);
        let nonce = Nonce::from_slice(nonce_bytes);
        let plaintext = self
            .cipher
            .decrypt(nonce, ciphertext)
            .map_err(|_| CapabilityError::internal("secret decryption failed"))?;
        String::from_utf8(plaintext)
            .map_err(|_| CapabilityError::internal("decrypted secret is not utf-8"))
    }
}

// ── Tests ───────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn test_key() -> String {
        B64.encode([7u8; KEY_LEN])
    }

    #[test]
    fn encrypt_decrypt_round_trip() {
        let cipher = SecretCipher::from_base64_key(&test_key()).unwrap();
        let payload = cipher.encrypt("secret-value").unwrap();
        assert_eq!(cipher.decrypt(&payload).unwrap(), "secret-value");
    }

    #[test]
    fn nonce_is_fresh_per_encryption() {
        let cipher = SecretCipher::from_base64_key(&test_key()).unwrap();
        let a = cipher.encrypt("same").unwrap();
        let b = cipher.encrypt("same").unwrap();
        assert_ne!(a, b);
        assert_eq!(cipher.decrypt(&a).unwrap(), cipher.decrypt(&b).unwrap());
    }

    #[test]
    fn short_key_fails_fast() {
        let short = B64.encode([1u8; 16]);
        assert!(SecretCipher::from_base64_key(&short).is_err());
    }

    #[test]
    fn non_base64_key_fails_fast() {
        assert!(SecretCipher::from_base64_key("not base64!!!").is_err());
    }

    #[test]
    fn wrong_key_fails_to_decrypt() {
        let a = SecretCipher::from_base64_key(&B64.encode([1u8; KEY_LEN])).unwrap();
        let b = SecretCipher::from_base64_key(&B64.encode([2u8; KEY_LEN])).unwrap();
        let payload = a.encrypt("secret-value").unwrap();
        assert!(b.decrypt(&payload).is_err());
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let cipher = SecretCipher::from_base64_key(&test_key()).unwrap();
        assert!(cipher.decrypt(&B64.encode([0u8; 4])).is_err());
    }
}
