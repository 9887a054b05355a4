//! Double-submit anti-forgery tokens
//!
//! The cookie holds `token|mac`; a form submission is accepted only when the
//! submitted token authenticates against that MAC.

use crate::session::SessionError;
use crate::utils::crypto::{
    derive_key, generate_csrf_token, sign_hmac_sha256, verify_hmac_sha256, ENCRYPTION_KEY_SIZE,
};

const CSRF_KEY_PURPOSE: &str = "csrf-token";

#[derive(Clone)]
pub struct CsrfGuard {
    key: [u8; ENCRYPTION_KEY_SIZE],
}

impl CsrfGuard {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: derive_key(CSRF_KEY_PURPOSE, secret),
        }
    }

    /// Generate a fresh token and the cookie value that vouches for it
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if the MAC cannot be computed
    pub fn issue(&self) -> Result<(String, String), SessionError> {
        let token = generate_csrf_token();
        let mac = sign_hmac_sha256(token.as_bytes(), &self.key)
            .map_err(|e| SessionError::Encoding(e.to_string()))?;
        let cookie_value = format!("{token}|{mac}");
        Ok((token, cookie_value))
    }

    /// The token carried by a cookie value, if the cookie is authentic
    #[must_use]
    pub fn token_from_cookie(&self, cookie_value: &str) -> Option<String> {
        let (token, mac) = cookie_value.split_once('|')?;
        verify_hmac_sha256(token.as_bytes(), mac, &self.key).then(|| token.to_string())
    }

    /// Whether `submitted` matches the token vouched for by `cookie_value`
    #[must_use]
    pub fn verify(&self, cookie_value: &str, submitted: &str) -> bool {
        if submitted.is_empty() {
            return false;
        }
        let Some((_, mac)) = cookie_value.split_once('|') else {
            return false;
        };
        verify_hmac_sha256(submitted.as_bytes(), mac, &self.key)
    }
}
