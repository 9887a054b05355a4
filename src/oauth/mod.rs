//! OAuth sign-in module
//!
//! Identity providers sit behind the [`IdentityProvider`] trait. The
//! [`ProviderRegistry`] looks providers up by id and seals the OAuth `state`
//! parameter so the callback can trust the provider and callback URL it carries
//! without any server-side storage.

pub mod notion;

pub use notion::NotionProvider;

use crate::models::ProviderAccount;
use crate::utils::crypto::{
    decrypt_data, derive_key, encrypt_data, generate_nonce, ENCRYPTION_KEY_SIZE,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

const STATE_KEY_PURPOSE: &str = "oauth-state";

/// How long a sign-in may take between redirect and callback
pub const STATE_MAX_AGE_SECONDS: i64 = 600;

/// Query parameters of a provider callback
#[derive(Deserialize, Debug, Default)]
pub struct OAuthCallback {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

/// Sign-in context carried through the provider inside the sealed `state`
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct OAuthState {
    pub nonce: String,
    pub provider: String,
    pub callback_url: Option<String>,
    pub issued_at: DateTime<Utc>,
}

/// OAuth flow errors
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),
    #[error("Configuration error: {0}")]
    Configuration(String),
    #[error("Invalid OAuth state: {0}")]
    InvalidState(String),
    #[error("Token exchange failed: {0}")]
    TokenExchange(String),
}

impl OAuthError {
    /// Short code placed in the error page's `error` query parameter
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            OAuthError::UnsupportedProvider(_) => "unsupported_provider",
            OAuthError::Configuration(_) => "configuration",
            OAuthError::InvalidState(_) => "invalid_state",
            OAuthError::TokenExchange(_) => "token_exchange_failed",
        }
    }
}

/// An OAuth identity provider
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Identifier used in routes and stored as the account's provider
    fn id(&self) -> &str;

    /// URL to send the browser to, carrying `state` back on the callback
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the provider is not configured
    fn authorization_url(&self, state: &str) -> Result<String, OAuthError>;

    /// Exchange an authorization code for the provider account
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::TokenExchange`] if the request fails or the
    /// response cannot be read
    async fn exchange_code(&self, code: &str) -> Result<ProviderAccount, OAuthError>;
}

/// Configured providers plus the key that seals OAuth state
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn IdentityProvider>>,
    state_key: [u8; ENCRYPTION_KEY_SIZE],
}

impl ProviderRegistry {
    #[must_use]
    pub fn new(secret: &[u8]) -> Self {
        Self {
            providers: HashMap::new(),
            state_key: derive_key(STATE_KEY_PURPOSE, secret),
        }
    }

    /// Register a provider under its id, replacing any previous one
    #[must_use]
    pub fn with_provider(mut self, provider: Arc<dyn IdentityProvider>) -> Self {
        log::info!("Registered identity provider '{}'", provider.id());
        self.providers.insert(provider.id().to_string(), provider);
        self
    }

    /// Look up a provider by id
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::UnsupportedProvider`] for unknown ids
    pub fn get(&self, id: &str) -> Result<Arc<dyn IdentityProvider>, OAuthError> {
        self.providers
            .get(id)
            .cloned()
            .ok_or_else(|| OAuthError::UnsupportedProvider(id.to_string()))
    }

    #[must_use]
    pub fn provider_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Seal a fresh state for a sign-in with `provider`
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if sealing fails
    pub fn seal_state(
        &self,
        provider: &str,
        callback_url: Option<String>,
    ) -> Result<(OAuthState, String), OAuthError> {
        let state = OAuthState {
            nonce: generate_nonce(16),
            provider: provider.to_string(),
            callback_url,
            issued_at: Utc::now(),
        };
        let sealed = encrypt_data(&state, &self.state_key)
            .map_err(|e| OAuthError::Configuration(format!("cannot seal OAuth state: {e}")))?;
        Ok((state, sealed))
    }

    /// Open a sealed state returned on `provider`'s callback
    ///
    /// # Errors
    ///
    /// See [`ProviderRegistry::open_state_at`]
    pub fn open_state(&self, sealed: &str, provider: &str) -> Result<OAuthState, OAuthError> {
        self.open_state_at(sealed, provider, Utc::now())
    }

    /// Open a sealed state against an explicit clock
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::InvalidState`] if the state was tampered with, was
    /// issued for another provider, or is older than [`STATE_MAX_AGE_SECONDS`]
    pub fn open_state_at(
        &self,
        sealed: &str,
        provider: &str,
        now: DateTime<Utc>,
    ) -> Result<OAuthState, OAuthError> {
        let state: OAuthState = decrypt_data(sealed, &self.state_key)
            .map_err(|e| OAuthError::InvalidState(format!("cannot open state: {e}")))?;

        if state.provider != provider {
            return Err(OAuthError::InvalidState(format!(
                "state was issued for '{}', callback is for '{provider}'",
                state.provider
            )));
        }
        if now - state.issued_at > Duration::seconds(STATE_MAX_AGE_SECONDS) {
            return Err(OAuthError::InvalidState(format!(
                "state issued at {} has expired",
                state.issued_at
            )));
        }

        Ok(state)
    }
}
