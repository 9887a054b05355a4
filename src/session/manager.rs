//! Session Manager - stateless sealed-cookie sessions
//!
//! The `SessionManager` composes the normalizer, codec, projection policy and
//! cookie policy for a single request. It holds only immutable configuration,
//! so one instance is cloned into every worker.
//!
//! A request is in exactly one [`SessionState`]: a session cookie that is
//! missing, fails verification, or has expired reads as `Unauthenticated`.

use crate::models::{AuthType, ClientSession, ProviderAccount, SessionClaims};
use crate::oauth::STATE_MAX_AGE_SECONDS;
use crate::session::codec::SessionCodec;
use crate::session::cookie::CookieSet;
use crate::session::csrf::CsrfGuard;
use crate::session::{normalizer, policy, SessionError};
use crate::settings::BrokerSettings;
use actix_web::cookie::time::Duration as CookieDuration;
use actix_web::HttpRequest;
use chrono::{DateTime, Duration, Utc};

/// Upper bound on a configured session lifetime (ten years)
const MAX_SESSION_HOURS: i64 = 24 * 366 * 10;

/// Authentication state of one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated(SessionClaims),
}

impl SessionState {
    #[must_use]
    pub fn claims(&self) -> Option<&SessionClaims> {
        match self {
            SessionState::Authenticated(claims) => Some(claims),
            SessionState::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn into_claims(self) -> Option<SessionClaims> {
        match self {
            SessionState::Authenticated(claims) => Some(claims),
            SessionState::Unauthenticated => None,
        }
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionState::Authenticated(_))
    }
}

/// A freshly sealed session and the `Set-Cookie` value that carries it
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub claims: SessionClaims,
    pub set_cookie: String,
}

#[derive(Clone)]
pub struct SessionManager {
    codec: SessionCodec,
    csrf: CsrfGuard,
    cookies: CookieSet,
    session_lifetime: Duration,
}

// =============================================================================
// Construction
// =============================================================================

impl SessionManager {
    #[must_use]
    pub fn new(secret: &[u8], cookies: CookieSet, session_duration_hours: u64) -> Self {
        let hours = i64::try_from(session_duration_hours)
            .unwrap_or(MAX_SESSION_HOURS)
            .min(MAX_SESSION_HOURS);
        Self {
            codec: SessionCodec::new(secret),
            csrf: CsrfGuard::new(secret),
            cookies,
            session_lifetime: Duration::hours(hours),
        }
    }

    #[must_use]
    pub fn from_settings(settings: &BrokerSettings) -> Self {
        let cookies = CookieSet::new(
            settings.application.environment.is_production(),
            &settings.cookies.base_name,
        );
        Self::new(
            settings.session.session_secret.as_bytes(),
            cookies,
            settings.session.session_duration_hours,
        )
    }

    #[must_use]
    pub fn cookies(&self) -> &CookieSet {
        &self.cookies
    }

    #[must_use]
    pub fn codec(&self) -> &SessionCodec {
        &self.codec
    }

    #[must_use]
    pub fn session_lifetime(&self) -> Duration {
        self.session_lifetime
    }
}

// =============================================================================
// Reading sessions
// =============================================================================

impl SessionManager {
    /// Resolve the session state of a request
    #[must_use]
    pub fn resolve(&self, req: &HttpRequest) -> SessionState {
        match req.cookie(&self.cookies.session_token.name) {
            Some(cookie) => self.resolve_token(cookie.value(), Utc::now()),
            None => SessionState::Unauthenticated,
        }
    }

    /// Resolve the session state carried by a token at `now`
    ///
    /// Verification failures and expiry are logged and read as unauthenticated.
    #[must_use]
    pub fn resolve_token(&self, token: &str, now: DateTime<Utc>) -> SessionState {
        match self.codec.decode_at(token, now) {
            Ok(claims) => SessionState::Authenticated(claims),
            Err(SessionError::TokenExpired(at)) => {
                log::debug!("Session expired at {at}, treating request as unauthenticated");
                SessionState::Unauthenticated
            }
            Err(e) => {
                log::warn!("Rejected session cookie: {e}");
                SessionState::Unauthenticated
            }
        }
    }

    /// Public view of the request's session, or `None` when unauthenticated
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::SecurityInvariantViolation`] if the projection
    /// would expose the access token
    pub fn client_session(&self, req: &HttpRequest) -> Result<Option<ClientSession>, SessionError> {
        self.resolve(req)
            .claims()
            .map(policy::project)
            .transpose()
    }
}

// =============================================================================
// Issuing sessions
// =============================================================================

impl SessionManager {
    /// Normalize a provider account and seal the resulting claims
    ///
    /// If the account carries no access token the existing claims are re-sealed
    /// unchanged.
    ///
    /// # Errors
    ///
    /// - [`SessionError::InvalidProviderResponse`] if the account is incomplete,
    ///   or carries no token while there is no session to keep
    /// - [`SessionError::Encoding`] if sealing fails
    pub fn issue(
        &self,
        existing: Option<SessionClaims>,
        account: &ProviderAccount,
    ) -> Result<IssuedSession, SessionError> {
        self.issue_at(existing, account, Utc::now())
    }

    /// [`SessionManager::issue`] against an explicit clock
    ///
    /// # Errors
    ///
    /// See [`SessionManager::issue`]
    pub fn issue_at(
        &self,
        existing: Option<SessionClaims>,
        account: &ProviderAccount,
        now: DateTime<Utc>,
    ) -> Result<IssuedSession, SessionError> {
        let claims = normalizer::normalize(existing, Some(account), now, self.session_lifetime)?
            .ok_or_else(|| {
                SessionError::InvalidProviderResponse(
                    "provider returned no access token and there is no session to keep".into(),
                )
            })?;

        let token = self.codec.encode(&claims)?;
        let max_age = (claims.expires_at - now).num_seconds().max(0);
        let set_cookie = self
            .cookies
            .session_token
            .header_value(&token, CookieDuration::seconds(max_age));

        log::info!(
            "Issued session for workspace '{}' (auth type: {}, expires {})",
            claims.workspace.name,
            claims.auth_type.map_or("none", AuthType::as_str),
            claims.expires_at
        );

        Ok(IssuedSession { claims, set_cookie })
    }

    /// `Set-Cookie` value that ends the session
    #[must_use]
    pub fn sign_out_cookie(&self) -> String {
        self.cookies.session_token.removal_header_value()
    }
}

// =============================================================================
// Sign-in and anti-forgery cookies
// =============================================================================

impl SessionManager {
    /// `Set-Cookie` value remembering where to send the user after sign-in
    #[must_use]
    pub fn callback_url_cookie(&self, callback_url: &str) -> String {
        self.cookies.callback_url.header_value(
            &urlencoding::encode(callback_url),
            CookieDuration::seconds(STATE_MAX_AGE_SECONDS),
        )
    }

    /// `Set-Cookie` value binding an OAuth state nonce to this browser
    #[must_use]
    pub fn state_cookie(&self, nonce: &str) -> String {
        self.cookies
            .state
            .header_value(nonce, CookieDuration::seconds(STATE_MAX_AGE_SECONDS))
    }

    /// Nonce stored by [`SessionManager::state_cookie`]
    #[must_use]
    pub fn state_nonce_from_request(&self, req: &HttpRequest) -> Option<String> {
        req.cookie(&self.cookies.state.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    /// Callback URL stored by [`SessionManager::callback_url_cookie`]
    ///
    /// actix percent-decodes cookie values when parsing the request.
    #[must_use]
    pub fn callback_url_from_request(&self, req: &HttpRequest) -> Option<String> {
        req.cookie(&self.cookies.callback_url.name)
            .map(|cookie| cookie.value().to_string())
            .filter(|value| !value.is_empty())
    }

    /// The request's anti-forgery token, minting one when missing or forged
    ///
    /// Returns the token and, when a new one was minted, the `Set-Cookie` value.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encoding`] if a new token cannot be minted
    pub fn csrf_token(&self, req: &HttpRequest) -> Result<(String, Option<String>), SessionError> {
        if let Some(token) = req
            .cookie(&self.cookies.csrf_token.name)
            .and_then(|cookie| self.csrf.token_from_cookie(cookie.value()))
        {
            return Ok((token, None));
        }

        let (token, cookie_value) = self.csrf.issue()?;
        let max_age = CookieDuration::seconds(self.session_lifetime.num_seconds());
        let set_cookie = self.cookies.csrf_token.header_value(&cookie_value, max_age);
        Ok((token, Some(set_cookie)))
    }

    /// Whether `submitted` matches the request's anti-forgery cookie
    #[must_use]
    pub fn verify_csrf(&self, req: &HttpRequest, submitted: &str) -> bool {
        req.cookie(&self.cookies.csrf_token.name)
            .is_some_and(|cookie| self.csrf.verify(cookie.value(), submitted))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::TestFixtures;
    use actix_web::cookie::Cookie;
    use actix_web::test::TestRequest;

    fn request_with_cookie(name: &str, value: &str) -> HttpRequest {
        TestRequest::default()
            .cookie(Cookie::new(name.to_string(), value.to_string()))
            .to_http_request()
    }

    #[test]
    fn test_issue_then_resolve() {
        let manager = TestFixtures::session_manager();
        let issued = manager
            .issue(None, &TestFixtures::notion_account())
            .unwrap();

        assert!(issued
            .set_cookie
            .starts_with(&format!("{}=", manager.cookies().session_token.name)));

        let token = TestFixtures::cookie_value(&issued.set_cookie);
        let state = manager.resolve_token(&token, Utc::now());
        assert_eq!(state, SessionState::Authenticated(issued.claims));
    }

    #[test]
    fn test_issue_without_token_keeps_existing_claims() {
        let manager = TestFixtures::session_manager();
        let existing = TestFixtures::claims();
        let mut account = TestFixtures::notion_account();
        account.access_token = None;

        let issued = manager.issue(Some(existing.clone()), &account).unwrap();
        assert_eq!(issued.claims, existing);
    }

    #[test]
    fn test_issue_without_token_or_session_fails() {
        let manager = TestFixtures::session_manager();
        let mut account = TestFixtures::notion_account();
        account.access_token = None;

        assert!(matches!(
            manager.issue(None, &account),
            Err(SessionError::InvalidProviderResponse(_))
        ));
    }

    #[test]
    fn test_cookie_max_age_matches_session_lifetime() {
        let manager = TestFixtures::session_manager();
        let now = Utc::now();
        let issued = manager
            .issue_at(None, &TestFixtures::notion_account(), now)
            .unwrap();

        let expected = manager.session_lifetime().num_seconds();
        assert!(issued.set_cookie.contains(&format!("Max-Age={expected}")));
        assert_eq!(issued.claims.expires_at, now + manager.session_lifetime());
    }

    #[test]
    fn test_resolve_request_states() {
        let manager = TestFixtures::session_manager();
        let name = manager.cookies().session_token.name.clone();

        let anonymous = TestRequest::default().to_http_request();
        assert_eq!(manager.resolve(&anonymous), SessionState::Unauthenticated);

        let forged = request_with_cookie(&name, "forged-token");
        assert_eq!(manager.resolve(&forged), SessionState::Unauthenticated);

        let expired_token = manager.codec().encode(&TestFixtures::expired_claims()).unwrap();
        let expired = request_with_cookie(&name, &expired_token);
        assert_eq!(manager.resolve(&expired), SessionState::Unauthenticated);

        let claims = TestFixtures::claims();
        let valid_token = manager.codec().encode(&claims).unwrap();
        let valid = request_with_cookie(&name, &valid_token);
        assert_eq!(manager.resolve(&valid), SessionState::Authenticated(claims));
    }

    #[test]
    fn test_client_session_from_request() {
        let manager = TestFixtures::session_manager();
        let name = manager.cookies().session_token.name.clone();
        let token = manager.codec().encode(&TestFixtures::claims()).unwrap();

        let session = manager
            .client_session(&request_with_cookie(&name, &token))
            .unwrap()
            .unwrap();
        assert_eq!(session.workspace.name, "Team Docs");

        let anonymous = TestRequest::default().to_http_request();
        assert_eq!(manager.client_session(&anonymous).unwrap(), None);
    }

    #[test]
    fn test_client_session_fails_closed_on_leak() {
        let manager = TestFixtures::session_manager();
        let name = manager.cookies().session_token.name.clone();
        let mut claims = TestFixtures::claims();
        claims.workspace.name.clone_from(&claims.access_token);
        let token = manager.codec().encode(&claims).unwrap();

        assert!(matches!(
            manager.client_session(&request_with_cookie(&name, &token)),
            Err(SessionError::SecurityInvariantViolation(_))
        ));
    }

    #[test]
    fn test_csrf_token_reused_when_cookie_is_valid() {
        let manager = TestFixtures::session_manager();
        let anonymous = TestRequest::default().to_http_request();

        let (token, set_cookie) = manager.csrf_token(&anonymous).unwrap();
        let set_cookie = set_cookie.expect("a new token sets a cookie");
        let cookie_value = TestFixtures::cookie_value(&set_cookie);

        let req = request_with_cookie(&manager.cookies().csrf_token.name, &cookie_value);
        let (again, set_cookie) = manager.csrf_token(&req).unwrap();
        assert_eq!(again, token);
        assert!(set_cookie.is_none());
        assert!(manager.verify_csrf(&req, &token));
        assert!(!manager.verify_csrf(&req, "something-else"));
        assert!(!manager.verify_csrf(&anonymous, &token));
    }

    #[test]
    fn test_callback_url_cookie_round_trip() {
        let manager = TestFixtures::session_manager();
        let header = manager.callback_url_cookie("/dashboard?tab=all");
        assert!(header.contains("%2Fdashboard%3Ftab%3Dall"));

        let req = TestRequest::default()
            .insert_header((
                actix_web::http::header::COOKIE,
                format!(
                    "{}={}",
                    manager.cookies().callback_url.name,
                    TestFixtures::cookie_value(&header)
                ),
            ))
            .to_http_request();
        assert_eq!(
            manager.callback_url_from_request(&req).as_deref(),
            Some("/dashboard?tab=all")
        );
    }

    #[test]
    fn test_state_cookie_round_trip() {
        let manager = TestFixtures::session_manager();
        let header = manager.state_cookie("nonce-123");
        assert!(header.starts_with(&format!("{}=nonce-123", manager.cookies().state.name)));
        assert!(header.contains("HttpOnly"));
        assert!(header.contains(&format!("Max-Age={STATE_MAX_AGE_SECONDS}")));

        let req = request_with_cookie(&manager.cookies().state.name, "nonce-123");
        assert_eq!(
            manager.state_nonce_from_request(&req).as_deref(),
            Some("nonce-123")
        );

        let anonymous = TestRequest::default().to_http_request();
        assert_eq!(manager.state_nonce_from_request(&anonymous), None);
    }

    #[test]
    fn test_sign_out_cookie_removes_session() {
        let manager = TestFixtures::session_manager();
        let header = manager.sign_out_cookie();
        assert!(header.starts_with(&format!("{}=;", manager.cookies().session_token.name)));
        assert!(header.contains("Max-Age=0"));
    }
}
