//! Session error kinds and their HTTP mapping

use crate::utils::responses::ResponseBuilder;
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use chrono::{DateTime, Utc};

/// Which verification check rejected a session token
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum VerificationFailure {
    /// Not decodable, truncated, or not a claims payload
    #[error("malformed token")]
    Malformed,
    /// Authentication tag did not match the session key
    #[error("signature mismatch")]
    Signature,
}

/// Errors raised while issuing, reading, or projecting a session
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The provider account lacks a field required to build claims
    #[error("Invalid provider response: {0}")]
    InvalidProviderResponse(String),

    #[error("Session token verification failed: {0}")]
    TokenVerificationFailed(VerificationFailure),

    #[error("Session token expired at {0}")]
    TokenExpired(DateTime<Utc>),

    /// A secret field was found on a value about to leave the server
    #[error("Security invariant violated: {0}")]
    SecurityInvariantViolation(String),

    /// Claims could not be sealed
    #[error("Session token could not be issued: {0}")]
    Encoding(String),
}

impl SessionError {
    /// Errors that fall back to the unauthenticated state instead of failing the request
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            SessionError::TokenVerificationFailed(_) | SessionError::TokenExpired(_)
        )
    }
}

impl ResponseError for SessionError {
    fn status_code(&self) -> StatusCode {
        match self {
            SessionError::TokenVerificationFailed(_) | SessionError::TokenExpired(_) => {
                StatusCode::UNAUTHORIZED
            }
            SessionError::InvalidProviderResponse(_) => StatusCode::BAD_GATEWAY,
            SessionError::SecurityInvariantViolation(_) | SessionError::Encoding(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        match self {
            SessionError::TokenVerificationFailed(_) | SessionError::TokenExpired(_) => {
                ResponseBuilder::unauthorized()
            }
            SessionError::InvalidProviderResponse(_) => ResponseBuilder::bad_gateway(),
            SessionError::SecurityInvariantViolation(_) | SessionError::Encoding(_) => {
                ResponseBuilder::server_error()
            }
        }
    }
}
