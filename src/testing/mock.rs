//! Mock identity provider for exercising the OAuth flow without a network

use crate::models::ProviderAccount;
use crate::oauth::{IdentityProvider, OAuthError};
use async_trait::async_trait;
use std::sync::Mutex;

use super::constants::TEST_AUTH_CODE;
use super::fixtures::TestFixtures;

const MOCK_AUTHORIZE_URL: &str = "https://provider.example.com/authorize";

/// What the mock returns from a code exchange
#[derive(Clone)]
pub enum MockExchange {
    Account(Box<ProviderAccount>),
    Failure(String),
}

/// Provider that authorizes against a fixed URL and answers exchanges from a script
pub struct MockProvider {
    id: String,
    exchange: MockExchange,
    received_codes: Mutex<Vec<String>>,
}

impl MockProvider {
    /// A `notion` provider answering [`TEST_AUTH_CODE`] with [`TestFixtures::notion_account`]
    #[must_use]
    pub fn notion() -> Self {
        Self::with_account(TestFixtures::notion_account())
    }

    #[must_use]
    pub fn with_account(account: ProviderAccount) -> Self {
        Self {
            id: account.provider.clone(),
            exchange: MockExchange::Account(Box::new(account)),
            received_codes: Mutex::new(Vec::new()),
        }
    }

    /// A `notion` provider whose token endpoint always fails
    #[must_use]
    pub fn failing(message: &str) -> Self {
        Self {
            id: "notion".to_string(),
            exchange: MockExchange::Failure(message.to_string()),
            received_codes: Mutex::new(Vec::new()),
        }
    }

    /// Codes passed to [`IdentityProvider::exchange_code`] so far
    ///
    /// # Panics
    ///
    /// Panics if the lock was poisoned by a panicking test
    #[must_use]
    pub fn received_codes(&self) -> Vec<String> {
        self.received_codes.lock().unwrap().clone()
    }
}

#[async_trait]
impl IdentityProvider for MockProvider {
    fn id(&self) -> &str {
        &self.id
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        Ok(format!(
            "{MOCK_AUTHORIZE_URL}?client_id=mock&state={}",
            urlencoding::encode(state)
        ))
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderAccount, OAuthError> {
        if let Ok(mut codes) = self.received_codes.lock() {
            codes.push(code.to_string());
        }
        if code != TEST_AUTH_CODE {
            return Err(OAuthError::TokenExchange(format!("unknown code '{code}'")));
        }
        match &self.exchange {
            MockExchange::Account(account) => Ok(account.as_ref().clone()),
            MockExchange::Failure(message) => Err(OAuthError::TokenExchange(message.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_mock_exchange() {
        let provider = MockProvider::notion();
        let account = provider.exchange_code(TEST_AUTH_CODE).await.unwrap();
        assert_eq!(account.provider, "notion");
        assert!(provider.exchange_code("other").await.is_err());
        assert_eq!(provider.received_codes(), vec![TEST_AUTH_CODE, "other"]);
    }

    #[actix_web::test]
    async fn test_failing_mock() {
        let provider = MockProvider::failing("boom");
        assert!(matches!(
            provider.exchange_code(TEST_AUTH_CODE).await,
            Err(OAuthError::TokenExchange(msg)) if msg == "boom"
        ));
    }
}
