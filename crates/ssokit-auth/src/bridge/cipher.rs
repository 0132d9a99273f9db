//! External identity encryption using AES-256-GCM.
//!
//! A bind code must never carry the third-party identifier in plaintext:
//! the identifier transits the frontend and comes back on the bind/create
//! call. [`ExternalIdCipher`] seals it into a single opaque string,
//! `base64url(nonce || ciphertext)`, with a fresh random nonce per
//! encryption.
//!
//! Key material is injected at construction; deployments load it from
//! their secret manager (or the `SSOKIT_BIND_CIPHER_KEY` environment
//! variable via [`ExternalIdCipher::from_env`]).

use aes_gcm::{
    Aes256Gcm, Nonce,
    aead::{Aead, KeyInit},
};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;

use crate::AuthResult;
use crate::error::AuthError;

/// Nonce size for AES-256-GCM (96 bits).
const NONCE_SIZE: usize = 12;

/// Key size for AES-256 (256 bits).
const KEY_SIZE: usize = 32;

/// Seals and opens external identifiers for transit through bind codes.
#[derive(Clone)]
pub struct ExternalIdCipher {
    key: [u8; KEY_SIZE],
}

impl ExternalIdCipher {
    /// Creates a cipher from raw key material.
    #[must_use]
    pub fn new(key: [u8; KEY_SIZE]) -> Self {
        Self { key }
    }

    /// Creates a cipher from the `SSOKIT_BIND_CIPHER_KEY` environment
    /// variable (64 hex chars or base64 for 32 bytes).
    ///
    /// # Errors
    ///
    /// Returns `Internal` if the variable is missing or does not decode to
    /// 32 bytes.
    pub fn from_env() -> AuthResult<Self> {
        let key_str = std::env::var("SSOKIT_BIND_CIPHER_KEY")
            .map_err(|_| AuthError::internal("SSOKIT_BIND_CIPHER_KEY is not set"))?;
        Ok(Self::new(Self::parse_key(&key_str)?))
    }

    /// Parses a key from a hex or base64 string.
    fn parse_key(key_str: &str) -> AuthResult<[u8; KEY_SIZE]> {
        let key_str = key_str.trim();

        let bytes = if key_str.len() == KEY_SIZE * 2 {
            hex::decode(key_str)
                .map_err(|e| AuthError::internal(format!("invalid hex cipher key: {e}")))?
        } else {
            base64::engine::general_purpose::STANDARD
                .decode(key_str)
                .map_err(|e| AuthError::internal(format!("invalid base64 cipher key: {e}")))?
        };

        if bytes.len() != KEY_SIZE {
            return Err(AuthError::internal(format!(
                "cipher key must be {KEY_SIZE} bytes, got {}",
                bytes.len()
            )));
        }

        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(key)
    }

    /// Generates a fresh random key.
    #[must_use]
    pub fn generate_key() -> [u8; KEY_SIZE] {
        let mut key = [0u8; KEY_SIZE];
        rand::thread_rng().fill_bytes(&mut key);
        key
    }

    /// Encrypts an external identifier into an opaque transit string.
    ///
    /// # Errors
    ///
    /// Returns `Internal` if encryption fails.
    pub fn encrypt(&self, external_id: &str) -> AuthResult<String> {
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| AuthError::internal(format!("failed to create cipher: {e}")))?;

        let mut nonce_bytes = [0u8; NONCE_SIZE];
        rand::thread_rng().fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);

        let ciphertext = cipher
            .encrypt(nonce, external_id.as_bytes())
            .map_err(|e| AuthError::internal(format!("encryption failed: {e}")))?;

        let mut sealed = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
        sealed.extend_from_slice(&nonce_bytes);
        sealed.extend_from_slice(&ciphertext);
        Ok(URL_SAFE_NO_PAD.encode(sealed))
    }

    /// Decrypts an opaque transit string back to the external identifier.
    ///
    /// # Errors
    ///
    /// Returns `InvalidGrant` if the payload is malformed or fails
    /// authentication; a tampered bind code must not decrypt.
    pub fn decrypt(&self, sealed: &str) -> AuthResult<String> {
        let bytes = URL_SAFE_NO_PAD
            .decode(sealed)
            .map_err(|_| AuthError::invalid_grant("Malformed encrypted identity payload"))?;

        if bytes.len() <= NONCE_SIZE {
            return Err(AuthError::invalid_grant(
                "Malformed encrypted identity payload",
            ));
        }

        let (nonce_bytes, ciphertext) = bytes.split_at(NONCE_SIZE);
        let cipher = Aes256Gcm::new_from_slice(&self.key)
            .map_err(|e| AuthError::internal(format!("failed to create cipher: {e}")))?;

        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
            .map_err(|_| AuthError::invalid_grant("Encrypted identity payload failed to open"))?;

        String::from_utf8(plaintext)
            .map_err(|_| AuthError::invalid_grant("Encrypted identity payload is not UTF-8"))
    }
}

impl std::fmt::Debug for ExternalIdCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalIdCipher")
            .field("key", &"<redacted>")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cipher() -> ExternalIdCipher {
        ExternalIdCipher::new(ExternalIdCipher::generate_key())
    }

    #[test]
    fn test_round_trip() {
        let cipher = cipher();
        let sealed = cipher.encrypt("openid-abc123").unwrap();

        assert_ne!(sealed, "openid-abc123");
        assert_eq!(cipher.decrypt(&sealed).unwrap(), "openid-abc123");
    }

    #[test]
    fn test_nonce_freshness() {
        let cipher = cipher();
        let a = cipher.encrypt("same-id").unwrap();
        let b = cipher.encrypt("same-id").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_wrong_key_fails() {
        let sealed = cipher().encrypt("openid-abc123").unwrap();
        let other = cipher();

        let err = other.decrypt(&sealed).unwrap_err();
        assert_eq!(err.oauth_error_code(), "invalid_grant");
    }

    #[test]
    fn test_tampered_payload_fails() {
        let cipher = cipher();
        let sealed = cipher.encrypt("openid-abc123").unwrap();

        let mut bytes = URL_SAFE_NO_PAD.decode(&sealed).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        let tampered = URL_SAFE_NO_PAD.encode(bytes);

        assert!(cipher.decrypt(&tampered).is_err());
    }

    #[test]
    fn test_malformed_payload_fails() {
        let cipher = cipher();
        assert!(cipher.decrypt("not base64url!!!").is_err());
        assert!(cipher.decrypt("AAAA").is_err());
    }

    #[test]
    fn test_parse_key_hex_and_base64() {
        let key = ExternalIdCipher::generate_key();

        let parsed = ExternalIdCipher::parse_key(&hex::encode(key)).unwrap();
        assert_eq!(parsed, key);

        let b64 = base64::engine::general_purpose::STANDARD.encode(key);
        let parsed = ExternalIdCipher::parse_key(&b64).unwrap();
        assert_eq!(parsed, key);

        assert!(ExternalIdCipher::parse_key("short").is_err());
    }

    #[test]
    fn test_debug_redacts_key() {
        let out = format!("{:?}", cipher());
        assert!(out.contains("<redacted>"));
    }
}
