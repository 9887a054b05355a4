//! Session Management Module
//!
//! Stateless sessions sealed into an HTTP-only cookie. A provider account is
//! normalized into claims, the claims are sealed by the codec, and only the
//! projected public view ever leaves the server.
//!
//! # Modules
//!
//! - [`normalizer`] - provider account to canonical claims
//! - [`codec`] - sealing and opening session tokens
//! - [`policy`] - client-facing projection and the no-secret check
//! - [`cookie`] - cookie names and attributes per environment
//! - [`csrf`] - double-submit anti-forgery tokens
//! - [`manager`] - per-request composition of the above

pub mod codec;
pub mod cookie;
pub mod csrf;
pub mod error;
pub mod manager;
pub mod normalizer;
pub mod policy;

pub use codec::SessionCodec;
pub use cookie::{CookieSet, CookieSpec};
pub use csrf::CsrfGuard;
pub use error::{SessionError, VerificationFailure};
pub use manager::{IssuedSession, SessionManager, SessionState};
pub use normalizer::normalize;
pub use policy::project;
