#![warn(clippy::pedantic)]
#![warn(clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

/// Version of the broker
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod handlers;
pub mod models;
pub mod oauth;
pub mod session;
pub mod settings;
pub mod utils;

// Testing utilities for unit tests and, behind the feature, integration tests
#[cfg(any(test, feature = "testing"))]
pub mod testing;

/// Re-export commonly used items
pub use handlers::configure_services;
pub use models::{ClientSession, ProviderAccount, SessionClaims};
pub use oauth::{IdentityProvider, NotionProvider, ProviderRegistry};
pub use session::{SessionError, SessionManager, SessionState};
pub use settings::BrokerSettings;
