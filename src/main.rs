#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use actix_cors::Cors;
use actix_web::{middleware::Logger, web, App, HttpServer};
use notion_session_broker::{
    configure_services,
    oauth::{NotionProvider, ProviderRegistry},
    settings::BrokerSettings,
    utils::logging::init_logger,
    SessionManager, VERSION,
};
use std::sync::Arc;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load configuration from .env, Settings.toml and environment variables
    let settings = BrokerSettings::load()
        .map_err(|e| std::io::Error::other(format!("Failed to load settings: {e:#}")))?;

    init_logger(&settings.logging)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize logger: {e}")))?;

    let notion = NotionProvider::from_settings(&settings)
        .map_err(|e| std::io::Error::other(format!("Failed to initialize Notion provider: {e}")))?;
    let registry = ProviderRegistry::new(settings.session.session_secret.as_bytes())
        .with_provider(Arc::new(notion));

    start_server(registry, settings).await
}

/// Start the server with stateless cookie sessions
///
/// # Errors
///
/// Returns an error if:
/// - Server binding fails
/// - Server fails to start
async fn start_server(registry: ProviderRegistry, settings: BrokerSettings) -> std::io::Result<()> {
    let bind_address = settings.get_bind_address();
    print_startup_info(&bind_address, &settings);

    let session_manager = SessionManager::from_settings(&settings);

    // Configure CORS for the frontend origins
    let cors_origins = settings.get_cors_origins();

    HttpServer::new(move || {
        let cors_origins = cors_origins.clone();
        let cors = Cors::default()
            .allowed_origin_fn(move |origin, _| {
                cors_origins
                    .iter()
                    .any(|allowed| allowed == origin.to_str().unwrap_or(""))
            })
            .allowed_methods(vec!["GET", "POST", "OPTIONS"])
            .allowed_headers(vec!["Content-Type", "Accept"])
            .supports_credentials()
            .max_age(3600);

        App::new()
            .app_data(web::Data::new(registry.clone()))
            .app_data(web::Data::new(settings.clone()))
            .app_data(web::Data::new(session_manager.clone()))
            .wrap(cors)
            .wrap(Logger::default())
            .configure(configure_services)
    })
    .bind(&bind_address)?
    .run()
    .await
}

fn print_startup_info(bind_address: &str, settings: &BrokerSettings) {
    log::info!("Starting Notion session broker {VERSION} on http://{bind_address}");
    log::info!(
        "Environment: {:?} (cookies: {})",
        settings.application.environment,
        if settings.application.environment.is_production() {
            "__Secure-/__Host- prefixed, Secure, Partitioned, SameSite=Lax"
        } else {
            "unprefixed, SameSite=None"
        }
    );
    log::info!("Endpoints:");
    log::info!("  GET  /auth/csrf                - Anti-forgery token");
    log::info!("  GET  /auth/signin?provider=... - Start sign-in");
    log::info!("  GET  /auth/callback/{{provider}} - Provider callback");
    log::info!("  POST /auth/signout             - Clear session");
    log::info!("  GET  /auth/session             - Current session");
    log::info!("  GET  /ping                     - Health check");
    log::info!("Notion redirect URI: {}", settings.notion_redirect_uri());
}
