//! Testing utilities for the session broker
//!
//! Shared by unit tests and, through the `testing` feature, by the
//! integration tests under `tests/`.
//!
//! ## Organization
//!
//! - [`fixtures`] - Pre-built test data (accounts, claims, managers, settings)
//! - [`mock`] - A scripted identity provider
//!
//! ## Usage
//!
//! ```rust,ignore
//! use notion_session_broker::testing::TestFixtures;
//!
//! let manager = TestFixtures::session_manager();
//! let issued = manager.issue(None, &TestFixtures::notion_account()).unwrap();
//! assert!(issued.set_cookie.contains("HttpOnly"));
//! ```

pub mod fixtures;
pub mod mock;

pub use fixtures::TestFixtures;
pub use mock::MockProvider;

/// Common test constants
pub mod constants {
    /// Session secret shared by every fixture
    pub const TEST_SESSION_SECRET_STR: &str = "test-session-secret-for-the-broker-0123456789";

    /// [`TEST_SESSION_SECRET_STR`] as key material
    pub const TEST_SESSION_SECRET: &[u8] = TEST_SESSION_SECRET_STR.as_bytes();

    /// Public origin of the broker in tests
    pub const TEST_REDIRECT_BASE_URL: &str = "https://auth.example.com";

    /// Access token the mock provider hands out
    pub const TEST_ACCESS_TOKEN: &str = "secret_notion_token";

    /// Authorization code the mock provider accepts
    pub const TEST_AUTH_CODE: &str = "test-authorization-code";
}
