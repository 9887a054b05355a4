// OAuth handlers: sign-in, callback, and sign-out
use crate::models::ProviderAccount;
use crate::oauth::{OAuthCallback, OAuthError, ProviderRegistry};
use crate::session::SessionManager;
use crate::settings::BrokerSettings;
use crate::utils::redirect_validator::validate_post_auth_redirect;
use crate::utils::responses::ResponseBuilder;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use log::{debug, info, warn};
use serde::Deserialize;

#[derive(Deserialize)]
pub struct SignInQuery {
    pub provider: Option<String>,
    pub callback_url: Option<String>,
}

#[derive(Deserialize)]
pub struct SignOutForm {
    #[serde(default)]
    pub csrf_token: String,
}

/// Start a sign-in: validate the callback URL, seal the state, and redirect
/// to the provider
///
/// # Errors
/// Never fails; invalid input produces a `400` response
pub async fn sign_in(
    query: web::Query<SignInQuery>,
    registry: web::Data<ProviderRegistry>,
    settings: web::Data<BrokerSettings>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    let Some(provider_id) = query.provider.as_deref() else {
        return Ok(ResponseBuilder::bad_request(
            "invalid_request",
            "The provider parameter is required",
        ));
    };

    let provider = match registry.get(provider_id) {
        Ok(provider) => provider,
        Err(e) => {
            warn!("Sign-in rejected: {e}");
            return Ok(ResponseBuilder::bad_request(e.code(), &e.to_string()));
        }
    };

    let callback_url = match query.callback_url.as_deref() {
        Some(url) => {
            match validate_post_auth_redirect(url, &settings.application.redirect_base_url) {
                Ok(url) => Some(url),
                Err(response) => return Ok(response),
            }
        }
        None => None,
    };

    let started = registry
        .seal_state(provider_id, callback_url.clone())
        .and_then(|(state, sealed)| {
            provider
                .authorization_url(&sealed)
                .map(|url| (state, url))
        });
    let (state, authorization_url) = match started {
        Ok(started) => started,
        Err(e) => {
            warn!("Cannot start sign-in with {provider_id}: {e}");
            return Ok(ResponseBuilder::error_redirect(
                &settings.pages.error,
                e.code(),
                &[],
            ));
        }
    };

    let mut cookies = vec![session_manager.state_cookie(&state.nonce)];
    if let Some(url) = &callback_url {
        cookies.push(session_manager.callback_url_cookie(url));
    }

    info!("Redirecting to {provider_id} for sign-in");
    Ok(ResponseBuilder::redirect_with_cookies(
        &authorization_url,
        &cookies,
    ))
}

/// Complete a sign-in: verify the state, exchange the code, and issue the
/// session cookie
///
/// # Errors
/// Returns a `502` if the provider account cannot be turned into a session,
/// or a `500` if the session cannot be sealed. OAuth failures redirect to the
/// error page instead.
pub async fn callback(
    path: web::Path<String>,
    query: web::Query<OAuthCallback>,
    req: HttpRequest,
    registry: web::Data<ProviderRegistry>,
    settings: web::Data<BrokerSettings>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    let provider_id = path.into_inner();
    let cookies = session_manager.cookies();
    let clear_sign_in = [
        cookies.callback_url.removal_header_value(),
        cookies.state.removal_header_value(),
    ];

    if let Some(error) = &query.error {
        warn!("{provider_id} returned an authorization error: {error}");
        return Ok(ResponseBuilder::error_redirect(
            &settings.pages.error,
            error,
            &clear_sign_in,
        ));
    }

    let bound_nonce = session_manager.state_nonce_from_request(&req);
    let outcome = exchange(&provider_id, &query, bound_nonce.as_deref(), &registry).await;
    let (state_callback_url, account) = match outcome {
        Ok(outcome) => outcome,
        Err(e) => {
            warn!("Sign-in callback for {provider_id} failed: {e}");
            return Ok(ResponseBuilder::error_redirect(
                &settings.pages.error,
                e.code(),
                &clear_sign_in,
            ));
        }
    };

    let existing = session_manager.resolve(&req).into_claims();
    let issued = session_manager.issue(existing, &account)?;

    let target = state_callback_url
        .or_else(|| {
            session_manager
                .callback_url_from_request(&req)
                .and_then(|url| {
                    validate_post_auth_redirect(&url, &settings.application.redirect_base_url).ok()
                })
        })
        .unwrap_or_else(|| "/".to_string());

    debug!("Sign-in complete, redirecting to {target}");
    let [clear_callback, clear_state] = clear_sign_in;
    Ok(ResponseBuilder::redirect_with_cookies(
        &target,
        &[issued.set_cookie, clear_callback, clear_state],
    ))
}

/// Open the state, check it belongs to this browser, and exchange the code
///
/// Returns the callback URL the state carried and the provider account.
async fn exchange(
    provider_id: &str,
    query: &OAuthCallback,
    bound_nonce: Option<&str>,
    registry: &ProviderRegistry,
) -> Result<(Option<String>, ProviderAccount), OAuthError> {
    let provider = registry.get(provider_id)?;

    let sealed = query
        .state
        .as_deref()
        .ok_or_else(|| OAuthError::InvalidState("callback carried no state".to_string()))?;
    let state = registry.open_state(sealed, provider_id)?;
    if bound_nonce != Some(state.nonce.as_str()) {
        return Err(OAuthError::InvalidState(
            "state was not issued to this browser".to_string(),
        ));
    }

    let code = query.code.as_deref().filter(|code| !code.is_empty()).ok_or_else(|| {
        OAuthError::TokenExchange("callback carried no authorization code".to_string())
    })?;
    let account = provider.exchange_code(code).await?;

    Ok((state.callback_url, account))
}

/// End the session after checking the anti-forgery token
///
/// # Errors
/// Never fails; a missing or mismatched token produces a `403` response
pub async fn sign_out(
    req: HttpRequest,
    form: web::Form<SignOutForm>,
    settings: web::Data<BrokerSettings>,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    if !session_manager.verify_csrf(&req, &form.csrf_token) {
        warn!("Sign-out rejected: anti-forgery token missing or mismatched");
        return Ok(ResponseBuilder::invalid_csrf());
    }

    info!("Signing out");
    Ok(ResponseBuilder::redirect_with_cookies(
        &settings.pages.sign_out,
        &[
            session_manager.sign_out_cookie(),
            session_manager.cookies().callback_url.removal_header_value(),
        ],
    ))
}
