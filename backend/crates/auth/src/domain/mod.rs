//! Domain Layer
//!
//! Entities, value objects, repository traits and the outbound ports
//! (identity provider, invite mailer).

pub mod entity;
pub mod identity;
pub mod mailer;
pub mod repository;
pub mod value_object;

// Re-exports
pub use entity::{
    group::{Group, GroupMembership},
    invite::Invite,
    user::User,
};
pub use identity::{IdentityProvider, ProviderError};
pub use mailer::InviteMailer;
pub use repository::{GroupRepository, InviteRepository, MembershipRepository, UserRepository};
