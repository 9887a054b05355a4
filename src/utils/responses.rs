//! HTTP response helpers
//!
//! Consistent JSON error bodies and redirect responses for the auth endpoints.
//! Error bodies are serialized once and reused.

use actix_web::{http::header, HttpResponse};
use serde_json::json;

/// Pre-serialized common error bodies
static CACHED_RESPONSES: std::sync::LazyLock<CachedResponses> =
    std::sync::LazyLock::new(CachedResponses::new);

struct CachedResponses {
    unauthorized: String,
    invalid_csrf: String,
    server_error: String,
    bad_gateway: String,
}

impl CachedResponses {
    fn new() -> Self {
        Self {
            unauthorized: Self::create_json(
                "unauthorized",
                "Authentication is required to access this resource",
            ),
            invalid_csrf: Self::create_json(
                "invalid_csrf",
                "The anti-forgery token is missing or does not match",
            ),
            server_error: Self::create_json("server_error", "An internal server error occurred"),
            bad_gateway: Self::create_json(
                "bad_gateway",
                "The identity provider returned an unusable response",
            ),
        }
    }

    fn create_json(error: &str, description: &str) -> String {
        json!({
            "error": error,
            "error_description": description
        })
        .to_string()
    }
}

/// Unified response builder
pub struct ResponseBuilder;

impl ResponseBuilder {
    #[must_use]
    pub fn unauthorized() -> HttpResponse {
        HttpResponse::Unauthorized()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(CACHED_RESPONSES.unauthorized.clone())
    }

    #[must_use]
    pub fn invalid_csrf() -> HttpResponse {
        HttpResponse::Forbidden()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(CACHED_RESPONSES.invalid_csrf.clone())
    }

    #[must_use]
    pub fn server_error() -> HttpResponse {
        HttpResponse::InternalServerError()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(CACHED_RESPONSES.server_error.clone())
    }

    #[must_use]
    pub fn bad_gateway() -> HttpResponse {
        HttpResponse::BadGateway()
            .insert_header((header::CONTENT_TYPE, "application/json"))
            .body(CACHED_RESPONSES.bad_gateway.clone())
    }

    /// Error response with a custom error code and description
    #[must_use]
    pub fn bad_request(error: &str, description: &str) -> HttpResponse {
        HttpResponse::BadRequest().json(json!({
            "error": error,
            "error_description": description
        }))
    }

    /// `302 Found` to `location`, attaching each pre-rendered `Set-Cookie` value
    #[must_use]
    pub fn redirect_with_cookies(location: &str, cookies: &[String]) -> HttpResponse {
        let mut builder = HttpResponse::Found();
        builder.insert_header((header::LOCATION, location.to_string()));
        for cookie in cookies {
            builder.append_header((header::SET_COOKIE, cookie.clone()));
        }
        builder.finish()
    }

    /// Redirect to the error page with an `error` query parameter
    #[must_use]
    pub fn error_redirect(error_page: &str, error: &str, cookies: &[String]) -> HttpResponse {
        let separator = if error_page.contains('?') { '&' } else { '?' };
        let location = format!("{error_page}{separator}error={}", urlencoding::encode(error));
        Self::redirect_with_cookies(&location, cookies)
    }
}
