use actix_web::HttpResponse;
use log::{debug, warn};
use url::Url;

const MAX_REDIRECT_LENGTH: usize = 2048;

// Allowed schemes for absolute callback URLs
const ALLOWED_SCHEMES: &[&str] = &["http", "https"];

/// Validate a post-sign-in callback URL to prevent open redirects
///
/// Accepts relative paths (`/x`, never `//x`) and absolute URLs with the same
/// origin as `redirect_base_url`. Returns the URL to redirect to.
///
/// # Errors
///
/// Returns a `400 Bad Request` response for anything else.
pub fn validate_post_auth_redirect(
    redirect_url: &str,
    redirect_base_url: &str,
) -> Result<String, HttpResponse> {
    debug!("Validating post-authentication redirect URL: {redirect_url}");

    if redirect_url.len() > MAX_REDIRECT_LENGTH {
        warn!("Excessively long redirect URL: {} characters", redirect_url.len());
        return Err(invalid_redirect_error());
    }

    for variant in decoded_variants(redirect_url) {
        if has_suspicious_characters(&variant) {
            warn!("Suspicious characters in redirect URL: {redirect_url}");
            return Err(invalid_redirect_error());
        }
    }

    if is_relative_url(redirect_url) {
        if decoded_variants(redirect_url)
            .iter()
            .any(|variant| !is_relative_url(variant) || variant.contains(".."))
        {
            warn!("Encoded escape from relative redirect: {redirect_url}");
            return Err(invalid_redirect_error());
        }
        return Ok(redirect_url.to_string());
    }

    validate_same_origin(redirect_url, redirect_base_url)
}

/// Relative path on this origin: starts with a single `/` and has no scheme
fn is_relative_url(url: &str) -> bool {
    url.starts_with('/') && !url.starts_with("//") && !url.contains(':')
}

fn validate_same_origin(
    redirect_url: &str,
    redirect_base_url: &str,
) -> Result<String, HttpResponse> {
    let parsed = Url::parse(redirect_url).map_err(|e| {
        warn!("Failed to parse redirect URL '{redirect_url}': {e}");
        invalid_redirect_error()
    })?;
    let base = Url::parse(redirect_base_url).map_err(|e| {
        warn!("Configured redirect base URL '{redirect_base_url}' is invalid: {e}");
        invalid_redirect_error()
    })?;

    if !ALLOWED_SCHEMES.contains(&parsed.scheme()) {
        warn!("Invalid scheme '{}' in redirect URL", parsed.scheme());
        return Err(invalid_redirect_error());
    }
    if !parsed.username().is_empty() || parsed.password().is_some() {
        warn!("Credentials embedded in redirect URL: {redirect_url}");
        return Err(invalid_redirect_error());
    }
    if parsed.origin() != base.origin() {
        warn!(
            "Cross-origin redirect blocked: {} is not {}",
            parsed.origin().ascii_serialization(),
            base.origin().ascii_serialization()
        );
        return Err(invalid_redirect_error());
    }

    Ok(parsed.to_string())
}

/// The URL as given plus its single and double percent-decoded forms
fn decoded_variants(url: &str) -> Vec<String> {
    let mut variants = vec![url.to_string()];
    let mut current = url.to_string();
    for _ in 0..2 {
        let decoded = match urlencoding::decode(&current) {
            Ok(decoded) if decoded != current.as_str() => decoded.into_owned(),
            _ => break,
        };
        variants.push(decoded.clone());
        current = decoded;
    }
    variants
}

/// Control characters, backslashes, and invisible formatting characters
fn has_suspicious_characters(text: &str) -> bool {
    text.chars().any(|c| {
        c.is_control()
            || c == '\\'
            || matches!(
                c,
                '\u{200B}'..='\u{200F}' | '\u{2000}'..='\u{200A}' | '\u{2060}'..='\u{2064}'
            )
    })
}

fn invalid_redirect_error() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "invalid_callback_url",
        "error_description": "The callback URL must stay on this service's origin"
    }))
}
