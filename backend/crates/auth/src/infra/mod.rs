//! Infrastructure Layer
//!
//! Database implementations and external service integrations.

pub mod identity_toolkit;
pub mod mailer;
pub mod postgres;
pub mod service_account;
pub mod token_verifier;

pub use identity_toolkit::{IdentityToolkitClient, IdentityToolkitConfig};
pub use mailer::{AppMailer, InviteTemplate, LogInviteMailer, SesInviteMailer};
pub use postgres::PgAuthRepository;
pub use service_account::ServiceCredentials;
