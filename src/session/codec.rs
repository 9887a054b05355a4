//! Session token codec
//!
//! Seals [`SessionClaims`] with AES-256-GCM so that any modification of the
//! token is detected on decode. Expiry is checked here, after authentication,
//! so callers never see stale claims.

use crate::models::SessionClaims;
use crate::session::{SessionError, VerificationFailure};
use crate::utils::crypto::{
    decrypt_data, derive_key, encrypt_data, DecryptError, ENCRYPTION_KEY_SIZE,
};
use chrono::{DateTime, Utc};

const SESSION_KEY_PURPOSE: &str = "session-token";

#[derive(Clone)]
pub struct SessionCodec {
    key: [u8; ENCRYPTION_KEY_SIZE],
}

impl SessionCodec {
    /// Create a codec keyed from the configured session secret
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            key: derive_key(SESSION_KEY_PURPOSE, secret),
        }
    }

    /// Seal claims into an opaque token string
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if serialization or encryption fails
    pub fn encode(&self, claims: &SessionClaims) -> Result<String, SessionError> {
        encrypt_data(claims, &self.key).map_err(|e| SessionError::Encoding(e.to_string()))
    }

    /// Open and verify a token against the current time
    ///
    /// # Errors
    ///
    /// See [`SessionCodec::decode_at`]
    pub fn decode(&self, token: &str) -> Result<SessionClaims, SessionError> {
        self.decode_at(token, Utc::now())
    }

    /// Open and verify a token against `now`
    ///
    /// # Errors
    ///
    /// - [`SessionError::TokenVerificationFailed`] with [`VerificationFailure::Malformed`]
    ///   if the token is not decodable or not a claims payload
    /// - [`SessionError::TokenVerificationFailed`] with [`VerificationFailure::Signature`]
    ///   if the authentication tag does not match
    /// - [`SessionError::TokenExpired`] if the claims expired at or before `now`
    pub fn decode_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<SessionClaims, SessionError> {
        let claims = decrypt_data::<SessionClaims>(token, &self.key).map_err(|e| {
            let failure = match e {
                DecryptError::Authentication => VerificationFailure::Signature,
                DecryptError::InvalidKey(_)
                | DecryptError::Encoding
                | DecryptError::Truncated
                | DecryptError::Deserialize(_) => VerificationFailure::Malformed,
            };
            log::debug!("Session token rejected: {e}");
            SessionError::TokenVerificationFailed(failure)
        })?;

        if claims.is_expired_at(now) {
            return Err(SessionError::TokenExpired(claims.expires_at));
        }

        Ok(claims)
    }
}
