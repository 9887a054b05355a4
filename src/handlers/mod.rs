// HTTP request handlers for the session broker
pub mod health;
pub mod oauth;
pub mod session;


use actix_web::web;

// Re-export the main handler functions
pub use health::health;
pub use oauth::{callback, sign_in, sign_out};
pub use session::{csrf, session};

/// Register every broker route
pub fn configure_services(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/csrf", web::get().to(csrf))
        .route("/auth/signin", web::get().to(sign_in))
        .route("/auth/callback/{provider}", web::get().to(callback))
        .route("/auth/signout", web::post().to(sign_out))
        .route("/auth/session", web::get().to(session))
        .route("/ping", web::get().to(health));
}
