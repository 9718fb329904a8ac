//! Respond Invite Use Case
//!
//! Accept or decline an invite as the authenticated user.
//!
//! Check order matters. Email match comes first so nobody learns anything
//! about somebody else's invite. The membership read precedes the status
//! check so a repeated accept reports `ALREADY_MEMBER` rather than
//! `ALREADY_USED`. The final write is a conditional update plus insert in
//! one transaction, which closes the double-accept race the reads cannot.

use std::sync::Arc;

use chrono::Utc;

use crate::application::verify_invite::{ensure_usable, find_invite};
use crate::domain::entity::{group::GroupMembership, invite::Invite, user::User};
use crate::domain::repository::{InviteRepository, MembershipRepository};
use crate::domain::value_object::invite_status::InviteStatus;
use crate::error::{AuthError, AuthResult};

/// Respond invite use case
pub struct RespondInviteUseCase<R>
where
    R: InviteRepository + MembershipRepository,
{
    repo: Arc<R>,
}

impl<R> RespondInviteUseCase<R>
where
    R: InviteRepository + MembershipRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn accept(&self, token: &str, user: &User) -> AuthResult<GroupMembership> {
        let invite = self.preconditions(token, user).await?;

        let membership = self.repo.accept_invite(&invite, user.id, Utc::now()).await?;

        tracing::info!(
            invite_id = %invite.id,
            group_id = %membership.group_id,
            user_id = %user.id,
            role = %membership.role,
            "Invite accepted"
        );

        Ok(membership)
    }

    pub async fn decline(&self, token: &str, user: &User) -> AuthResult<()> {
        let invite = self.preconditions(token, user).await?;

        if !self
            .repo
            .transition_from_pending(invite.id, InviteStatus::Declined)
            .await?
        {
            return Err(AuthError::AlreadyUsed);
        }

        tracing::info!(invite_id = %invite.id, user_id = %user.id, "Invite declined");
        Ok(())
    }

    async fn preconditions(&self, token: &str, user: &User) -> AuthResult<Invite> {
        let invite = find_invite(self.repo.as_ref(), token).await?;

        if !invite.email.matches(user.email.as_str()) {
            tracing::warn!(
                invite_id = %invite.id,
                user_id = %user.id,
                "Invite presented by a different account"
            );
            return Err(AuthError::EmailMismatch);
        }

        if self
            .repo
            .find_membership(invite.group_id, user.id)
            .await?
            .is_some()
        {
            return Err(AuthError::AlreadyMember);
        }

        ensure_usable(self.repo.as_ref(), &invite, Utc::now()).await?;
        Ok(invite)
    }
}
