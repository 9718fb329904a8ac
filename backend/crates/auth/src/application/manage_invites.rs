//! Manage Invites Use Case
//!
//! Listing and revoking a group's invites; managers only.

use std::sync::Arc;

use kernel::id::InviteId;

use crate::application::authenticate::require_manager;
use crate::domain::entity::{group::GroupMembership, invite::Invite};
use crate::domain::repository::InviteRepository;
use crate::error::{AuthError, AuthResult};

/// Manage invites use case
pub struct ManageInvitesUseCase<R>
where
    R: InviteRepository,
{
    repo: Arc<R>,
}

impl<R> ManageInvitesUseCase<R>
where
    R: InviteRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    /// All invites of the caller's group, newest first
    pub async fn list(&self, membership: &GroupMembership) -> AuthResult<Vec<Invite>> {
        require_manager(membership)?;
        self.repo.list_by_group(membership.group_id).await
    }

    /// Revoke an invite of the caller's group
    pub async fn delete(&self, membership: &GroupMembership, id: InviteId) -> AuthResult<()> {
        require_manager(membership)?;

        if !self.repo.delete_in_group(id, membership.group_id).await? {
            return Err(AuthError::NotFound("Invite"));
        }

        tracing::info!(invite_id = %id, group_id = %membership.group_id, "Invite deleted");
        Ok(())
    }
}
