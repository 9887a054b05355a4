//! Test fixtures providing pre-built test objects

use crate::models::{AuthType, ProviderAccount, SessionClaims, Workspace};
use crate::oauth::ProviderRegistry;
use crate::session::{CookieSet, SessionManager};
use crate::settings::{BrokerSettings, Environment};
use chrono::{Duration, Utc};
use std::sync::Arc;

use super::constants::{
    TEST_ACCESS_TOKEN, TEST_REDIRECT_BASE_URL, TEST_SESSION_SECRET, TEST_SESSION_SECRET_STR,
};
use super::mock::MockProvider;

/// Central fixture provider for all test data
pub struct TestFixtures;

impl TestFixtures {
    /// Account as returned by a successful Notion token exchange
    #[must_use]
    pub fn notion_account() -> ProviderAccount {
        ProviderAccount {
            provider: "notion".to_string(),
            access_token: Some(TEST_ACCESS_TOKEN.to_string()),
            bot_id: Some("bot-1234".into()),
            workspace_id: Some("ws-5678".into()),
            workspace_name: Some("Team Docs".to_string()),
            workspace_icon: Some("https://example.com/icon.png".to_string()),
        }
    }

    /// Claims for [`TestFixtures::notion_account`], valid for one more day
    #[must_use]
    pub fn claims() -> SessionClaims {
        let now = Utc::now();
        SessionClaims {
            access_token: TEST_ACCESS_TOKEN.to_string(),
            bot_id: "bot-1234".to_string(),
            auth_type: Some(AuthType::Notion),
            workspace: Workspace {
                id: "ws-5678".to_string(),
                name: "Team Docs".to_string(),
                icon: Some("https://example.com/icon.png".to_string()),
            },
            authenticated_at: now,
            expires_at: now + Duration::hours(24),
        }
    }

    /// Claims that expired an hour ago
    #[must_use]
    pub fn expired_claims() -> SessionClaims {
        let mut claims = Self::claims();
        claims.authenticated_at = Utc::now() - Duration::hours(25);
        claims.expires_at = Utc::now() - Duration::hours(1);
        claims
    }

    /// Production-policy session manager with a 24 hour lifetime
    #[must_use]
    pub fn session_manager() -> SessionManager {
        SessionManager::new(TEST_SESSION_SECRET, CookieSet::for_environment(true), 24)
    }

    /// Production settings with the test secret and mock-friendly Notion values
    #[must_use]
    pub fn settings() -> BrokerSettings {
        let mut settings = BrokerSettings::default();
        settings.application.environment = Environment::Production;
        settings.application.redirect_base_url = TEST_REDIRECT_BASE_URL.to_string();
        settings.session.session_secret = TEST_SESSION_SECRET_STR.to_string();
        settings.session.session_duration_hours = 24;
        settings.pages.error = "/auth/error".to_string();
        settings.notion.client_id = "test-client-id".to_string();
        settings.notion.client_secret = "test-client-secret".to_string();
        settings
    }

    /// Registry holding a [`MockProvider`] registered as `notion`
    #[must_use]
    pub fn registry() -> ProviderRegistry {
        Self::registry_with(MockProvider::notion())
    }

    #[must_use]
    pub fn registry_with(provider: MockProvider) -> ProviderRegistry {
        ProviderRegistry::new(TEST_SESSION_SECRET).with_provider(Arc::new(provider))
    }

    /// `Cookie` request pair binding `nonce` to the browser, as set on sign-in
    #[must_use]
    pub fn state_cookie_pair(nonce: &str) -> String {
        let manager = Self::session_manager();
        format!(
            "{}={}",
            manager.cookies().state.name,
            Self::cookie_value(&manager.state_cookie(nonce))
        )
    }

    /// The value part of a rendered `Set-Cookie` header
    #[must_use]
    pub fn cookie_value(set_cookie: &str) -> String {
        set_cookie
            .split(';')
            .next()
            .and_then(|pair| pair.split_once('='))
            .map(|(_, value)| value.to_string())
            .unwrap_or_default()
    }

    /// The name part of a rendered `Set-Cookie` header
    #[must_use]
    pub fn cookie_name(set_cookie: &str) -> String {
        set_cookie
            .split_once('=')
            .map(|(name, _)| name.to_string())
            .unwrap_or_default()
    }
}
