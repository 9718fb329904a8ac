//! Application Layer
//!
//! Use cases and application services.

pub mod authenticate;
pub mod config;
pub mod create_invite;
pub mod error_normalizer;
pub mod manage_invites;
pub mod refresh_session;
pub mod respond_invite;
pub mod sign_in;
pub mod sign_up;
pub mod verify_invite;

// Re-exports
pub use authenticate::{AuthenticateUseCase, require_admin, require_manager};
pub use config::{AuthConfig, Locale};
pub use create_invite::{CreateInviteInput, CreateInviteUseCase};
pub use error_normalizer::{ErrorNormalizer, NormalizedError, ProviderErrorRule};
pub use manage_invites::ManageInvitesUseCase;
pub use refresh_session::{RefreshSessionOutput, RefreshSessionUseCase};
pub use respond_invite::RespondInviteUseCase;
pub use sign_in::{SignInInput, SignInOutput, SignInUseCase};
pub use sign_up::{SignUpInput, SignUpUseCase};
pub use verify_invite::{InviteView, VerifyInviteUseCase};
