// Cryptographic utilities for sealing session data and generating secure tokens

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use anyhow::{anyhow, Context, Result};
use base64::{engine::general_purpose, Engine as _};
use hmac::{Hmac, Mac};
use rand::RngCore;
use serde::{de::DeserializeOwned, Serialize};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Nonce size for AES-256-GCM encryption (96 bits)
pub const NONCE_SIZE: usize = 12;

/// Encryption key size for AES-256 (256 bits)
pub const ENCRYPTION_KEY_SIZE: usize = 32;

/// Why a sealed payload could not be opened
#[derive(Debug, thiserror::Error)]
pub enum DecryptError {
    #[error("invalid key length: expected {ENCRYPTION_KEY_SIZE} bytes, got {0}")]
    InvalidKey(usize),
    #[error("payload is not valid base64url")]
    Encoding,
    #[error("payload is shorter than the nonce")]
    Truncated,
    #[error("authentication tag mismatch")]
    Authentication,
    #[error("decrypted payload is not the expected shape: {0}")]
    Deserialize(String),
}

/// Generate a cryptographically secure CSRF token
///
/// 24 bytes (192 bits) of entropy, base64url-encoded to 32 characters.
#[must_use]
pub fn generate_csrf_token() -> String {
    generate_nonce(24)
}

/// Generate a base64url-encoded nonce of `length` random bytes
#[must_use]
pub fn generate_nonce(length: usize) -> String {
    let mut nonce = vec![0u8; length];
    rand::rng().fill_bytes(&mut nonce);
    general_purpose::URL_SAFE_NO_PAD.encode(nonce)
}

/// Generic encryption function for any serializable data using AES-256-GCM
///
/// # Returns
///
/// A Base64URL-encoded string containing the nonce + ciphertext
///
/// # Errors
///
/// Returns an error if:
/// - Serialization fails
/// - Key length is invalid
/// - AES encryption fails
pub fn encrypt_data<T: Serialize>(data: &T, key: &[u8]) -> Result<String> {
    if key.len() != ENCRYPTION_KEY_SIZE {
        return Err(anyhow!(
            "Invalid key length: expected {ENCRYPTION_KEY_SIZE} bytes, got {}",
            key.len()
        ));
    }

    let json_data = serde_json::to_vec(data).context("Failed to serialize data")?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let ciphertext = cipher
        .encrypt(nonce, json_data.as_slice())
        .map_err(|e| anyhow!("AES encryption failed: {e}"))?;

    let mut combined = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    combined.extend_from_slice(&nonce_bytes);
    combined.extend_from_slice(&ciphertext);

    Ok(general_purpose::URL_SAFE_NO_PAD.encode(&combined))
}

/// Generic decryption function for any deserializable data using AES-256-GCM
///
/// The error distinguishes a payload that could never have been produced by
/// [`encrypt_data`] (encoding, truncation, shape) from one whose authentication
/// tag does not match the key.
///
/// # Errors
///
/// Returns a [`DecryptError`] describing the first check that failed.
pub fn decrypt_data<T: DeserializeOwned>(
    encrypted_data: &str,
    key: &[u8],
) -> Result<T, DecryptError> {
    if key.len() != ENCRYPTION_KEY_SIZE {
        return Err(DecryptError::InvalidKey(key.len()));
    }

    let combined = general_purpose::URL_SAFE_NO_PAD
        .decode(encrypted_data)
        .map_err(|_| DecryptError::Encoding)?;

    if combined.len() <= NONCE_SIZE {
        return Err(DecryptError::Truncated);
    }

    let (nonce_bytes, ciphertext) = combined.split_at(NONCE_SIZE);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(key));
    let plaintext = cipher
        .decrypt(nonce, ciphertext)
        .map_err(|_| DecryptError::Authentication)?;

    serde_json::from_slice(&plaintext).map_err(|e| DecryptError::Deserialize(e.to_string()))
}

/// Derive a 32-byte key for one purpose from the configured secret
///
/// Each purpose (session token, OAuth state, CSRF) gets its own key so that a
/// value sealed for one cannot be opened as another.
#[must_use]
pub fn derive_key(purpose: &str, secret: &[u8]) -> [u8; ENCRYPTION_KEY_SIZE] {
    let mut hasher = Sha256::new();
    hasher.update(purpose.as_bytes());
    hasher.update([0u8]);
    hasher.update(secret);
    hasher.finalize().into()
}

/// Compute a base64url HMAC-SHA256 tag over `message`
///
/// # Errors
///
/// Returns an error if HMAC computation fails
pub fn sign_hmac_sha256(message: &[u8], key: &[u8]) -> Result<String> {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(key)
        .map_err(|e| anyhow!("Invalid HMAC key length: {e}"))?;
    mac.update(message);
    Ok(general_purpose::URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
}

/// Verify a base64url HMAC-SHA256 tag in constant time
#[must_use]
pub fn verify_hmac_sha256(message: &[u8], tag: &str, key: &[u8]) -> bool {
    let Ok(tag_bytes) = general_purpose::URL_SAFE_NO_PAD.decode(tag) else {
        return false;
    };
    let Ok(mut mac) = <HmacSha256 as Mac>::new_from_slice(key) else {
        return false;
    };
    mac.update(message);
    mac.verify_slice(&tag_bytes).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct Payload {
        name: String,
        count: u32,
    }

    fn key() -> [u8; 32] {
        derive_key("test", b"test_key_32_bytes_long_for_test_")
    }

    #[test]
    fn test_encrypt_decrypt() {
        let payload = Payload {
            name: "workspace".to_string(),
            count: 3,
        };
        let sealed = encrypt_data(&payload, &key()).unwrap();
        let opened: Payload = decrypt_data(&sealed, &key()).unwrap();
        assert_eq!(opened, payload);
    }

    #[test]
    fn test_encrypt_uses_fresh_nonce() {
        let payload = Payload {
            name: "a".to_string(),
            count: 1,
        };
        let first = encrypt_data(&payload, &key()).unwrap();
        let second = encrypt_data(&payload, &key()).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_decrypt_with_wrong_key() {
        let payload = Payload {
            name: "a".to_string(),
            count: 1,
        };
        let sealed = encrypt_data(&payload, &key()).unwrap();
        let other = derive_key("other", b"test_key_32_bytes_long_for_test_");
        let result = decrypt_data::<Payload>(&sealed, &other);
        assert!(matches!(result, Err(DecryptError::Authentication)));
    }

    #[test]
    fn test_decrypt_rejects_garbage() {
        assert!(matches!(
            decrypt_data::<Payload>("not base64!", &key()),
            Err(DecryptError::Encoding)
        ));
        assert!(matches!(
            decrypt_data::<Payload>("AAAA", &key()),
            Err(DecryptError::Truncated)
        ));
    }

    #[test]
    fn test_invalid_key_length() {
        let result = encrypt_data(&1u8, b"short");
        assert!(result.is_err());
        assert!(matches!(
            decrypt_data::<u8>("AAAA", b"short"),
            Err(DecryptError::InvalidKey(5))
        ));
    }

    #[test]
    fn test_derive_key_separates_purposes() {
        let secret = b"same secret";
        assert_ne!(derive_key("session", secret), derive_key("state", secret));
        assert_eq!(derive_key("session", secret), derive_key("session", secret));
    }

    #[test]
    fn test_hmac_round_trip() {
        let tag = sign_hmac_sha256(b"token", b"key").unwrap();
        assert!(verify_hmac_sha256(b"token", &tag, b"key"));
        assert!(!verify_hmac_sha256(b"other", &tag, b"key"));
        assert!(!verify_hmac_sha256(b"token", &tag, b"other key"));
        assert!(!verify_hmac_sha256(b"token", "***", b"key"));
    }

    #[test]
    fn test_hmac_accepts_any_key_length() {
        let keys: [&[u8]; 3] = [b"", b"k", &[7u8; 200]];
        for key in keys {
            let tag = sign_hmac_sha256(b"message", key).unwrap();
            assert!(verify_hmac_sha256(b"message", &tag, key));
        }
    }

    #[test]
    fn test_csrf_token_entropy() {
        let token = generate_csrf_token();
        assert_eq!(token.len(), 32);
        assert_ne!(token, generate_csrf_token());
    }
}
