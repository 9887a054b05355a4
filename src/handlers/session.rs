// Session handlers: current session and anti-forgery token
use crate::session::SessionManager;
use crate::utils::responses::ResponseBuilder;
use actix_web::{http::header, web, HttpRequest, HttpResponse, Result};
use serde_json::json;

/// Return the public view of the caller's session
///
/// # Errors
/// Returns a `500` if the projected view would expose the access token
pub async fn session(
    req: HttpRequest,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    match session_manager.client_session(&req)? {
        Some(session) => Ok(HttpResponse::Ok().json(session)),
        None => Ok(ResponseBuilder::unauthorized()),
    }
}

/// Return the caller's anti-forgery token, setting the cookie if needed
///
/// # Errors
/// Returns a `500` if a new token cannot be minted
pub async fn csrf(
    req: HttpRequest,
    session_manager: web::Data<SessionManager>,
) -> Result<HttpResponse> {
    let (token, set_cookie) = session_manager.csrf_token(&req)?;

    let mut response = HttpResponse::Ok();
    response.insert_header((header::CACHE_CONTROL, "no-store"));
    if let Some(cookie) = set_cookie {
        response.append_header((header::SET_COOKIE, cookie));
    }
    Ok(response.json(json!({ "csrfToken": token })))
}
