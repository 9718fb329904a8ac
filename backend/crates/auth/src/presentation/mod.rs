//! Presentation Layer
//!
//! HTTP handlers, DTOs, router, and middleware.

pub mod dto;
pub mod handlers;
pub mod middleware;
pub mod router;

pub use handlers::{AuthAppState, AuthStore, MailerPort, ProviderPort};
pub use middleware::{
    CurrentUser, GROUP_ID_HEADER, GroupContext, require_admin_user, require_auth,
    require_group_membership,
};
pub use router::auth_router;
