//! Notion public-integration OAuth
//!
//! One token request per sign-in, authenticated with HTTP basic client
//! credentials. The request is bounded by the client timeout and never retried.

use crate::models::ProviderAccount;
use crate::oauth::{IdentityProvider, OAuthError};
use crate::settings::BrokerSettings;
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use std::time::Duration;
use url::Url;

pub const NOTION_PROVIDER_ID: &str = "notion";

#[derive(Serialize)]
struct TokenRequest<'a> {
    grant_type: &'static str,
    code: &'a str,
    redirect_uri: &'a str,
}

pub struct NotionProvider {
    client_id: String,
    client_secret: String,
    redirect_uri: String,
    authorization_endpoint: String,
    token_endpoint: String,
    http_client: reqwest::Client,
}

impl NotionProvider {
    /// Build the provider from settings
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::Configuration`] if the client id or secret is
    /// missing or the HTTP client cannot be built
    pub fn from_settings(settings: &BrokerSettings) -> Result<Self, OAuthError> {
        let notion = &settings.notion;
        if notion.client_id.is_empty() {
            return Err(OAuthError::Configuration(
                "Notion client id not configured (AUTH_NOTION_ID)".to_string(),
            ));
        }
        if notion.client_secret.is_empty() {
            return Err(OAuthError::Configuration(
                "Notion client secret not configured (AUTH_NOTION_SECRET)".to_string(),
            ));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(notion.request_timeout_seconds))
            .build()
            .map_err(|e| OAuthError::Configuration(format!("cannot build HTTP client: {e}")))?;

        Ok(Self {
            client_id: notion.client_id.clone(),
            client_secret: notion.client_secret.clone(),
            redirect_uri: settings.notion_redirect_uri(),
            authorization_endpoint: notion.authorization_endpoint.clone(),
            token_endpoint: notion.token_endpoint.clone(),
            http_client,
        })
    }

    /// Map a token endpoint response onto the provider account
    fn parse_token_response(status: StatusCode, body: &str) -> Result<ProviderAccount, OAuthError> {
        if !status.is_success() {
            // Error bodies carry `error`/`error_description`, never a token
            return Err(OAuthError::TokenExchange(format!(
                "Notion responded with status {status}: {body}"
            )));
        }

        let mut account: ProviderAccount = serde_json::from_str(body).map_err(|e| {
            OAuthError::TokenExchange(format!("cannot parse Notion token response: {e}"))
        })?;
        account.provider = NOTION_PROVIDER_ID.to_string();
        Ok(account)
    }
}

#[async_trait]
impl IdentityProvider for NotionProvider {
    fn id(&self) -> &str {
        NOTION_PROVIDER_ID
    }

    fn authorization_url(&self, state: &str) -> Result<String, OAuthError> {
        let mut url = Url::parse(&self.authorization_endpoint).map_err(|e| {
            OAuthError::Configuration(format!(
                "invalid authorization endpoint '{}': {e}",
                self.authorization_endpoint
            ))
        })?;
        url.query_pairs_mut()
            .append_pair("client_id", &self.client_id)
            .append_pair("response_type", "code")
            .append_pair("owner", "user")
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("state", state);
        Ok(url.into())
    }

    async fn exchange_code(&self, code: &str) -> Result<ProviderAccount, OAuthError> {
        log::debug!("Exchanging authorization code with Notion");
        let response = self
            .http_client
            .post(&self.token_endpoint)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .json(&TokenRequest {
                grant_type: "authorization_code",
                code,
                redirect_uri: &self.redirect_uri,
            })
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("request to Notion failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("cannot read Notion response: {e}")))?;

        let account = Self::parse_token_response(status, &body)?;
        log::info!(
            "Notion token exchange succeeded for workspace {:?}",
            account.workspace_name
        );
        Ok(account)
    }
}
