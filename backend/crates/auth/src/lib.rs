//! Auth (Authentication & Authorization) Backend Module
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, repository traits, provider/mailer ports
//! - `application/` - Use cases, configuration, provider error normalization
//! - `infra/` - PostgreSQL, Firebase Auth REST client, SES mailer
//! - `presentation/` - HTTP handlers, DTOs, middleware, router
//!
//! ## Features
//! - Password login/signup delegated to an external identity provider
//! - Email verification gate before any session is issued
//! - Provider-signed session cookies with refresh-token rotation
//! - Application idle timeout on top of the provider token lifetime
//! - Group invites: single-use, email-bound, time-limited
//!
//! ## Security Model
//! - No passwords are stored locally
//! - Email and provider UID map to exactly one local user (store-enforced)
//! - Invite acceptance is a conditional update; double accepts cannot
//!   create two memberships

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use application::config::AuthConfig;
pub use error::{AuthError, AuthResult};
pub use infra::postgres::PgAuthRepository;
pub use presentation::router::auth_router;

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

// Convenience re-exports
pub mod config {
    pub use crate::application::config::*;
}

pub mod models {
    pub use crate::domain::entity::*;
    pub use crate::domain::value_object::*;
    pub use crate::presentation::dto::*;
}

pub mod middleware {
    pub use crate::presentation::middleware::*;
}
