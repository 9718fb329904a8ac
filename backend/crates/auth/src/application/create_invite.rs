//! Create Invite Use Case
//!
//! A group manager invites an email address into the group. The invite row
//! and the mail carrying its token live or die together: if delivery fails
//! the row is deleted again, since nobody could ever discover the token.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::{GroupId, UserId};

use crate::application::authenticate::require_manager;
use crate::application::config::AuthConfig;
use crate::domain::entity::invite::{Invite, NewInvite};
use crate::domain::mailer::{InviteMailer, InviteNotification};
use crate::domain::repository::{
    GroupRepository, InviteRepository, MembershipRepository, UserRepository,
};
use crate::domain::value_object::{
    email::Email, invite_token::InviteToken, member_role::MemberRole,
};
use crate::error::{AuthError, AuthResult};

/// Create invite input
pub struct CreateInviteInput {
    pub email: String,
    /// Raw role; blank means `member`
    pub role: String,
    pub invited_by: UserId,
    pub group_id: GroupId,
}

/// Create invite use case
pub struct CreateInviteUseCase<R, M>
where
    R: UserRepository + GroupRepository + MembershipRepository + InviteRepository,
    M: InviteMailer,
{
    repo: Arc<R>,
    mailer: Arc<M>,
    config: Arc<AuthConfig>,
}

impl<R, M> CreateInviteUseCase<R, M>
where
    R: UserRepository + GroupRepository + MembershipRepository + InviteRepository,
    M: InviteMailer,
{
    pub fn new(repo: Arc<R>, mailer: Arc<M>, config: Arc<AuthConfig>) -> Self {
        Self {
            repo,
            mailer,
            config,
        }
    }

    pub async fn execute(&self, input: CreateInviteInput) -> AuthResult<Invite> {
        let role = MemberRole::parse_invite_role(&input.role)?;
        let email = Email::new(input.email)?;

        let inviter = self
            .repo
            .find_membership(input.group_id, input.invited_by)
            .await?
            .ok_or(AuthError::Forbidden)?;
        require_manager(&inviter)?;

        let group = self
            .repo
            .find_group(input.group_id)
            .await?
            .ok_or(AuthError::NotFound("Group"))?;

        let invite = self
            .repo
            .create_invite(&NewInvite {
                group_id: group.id,
                email,
                token: InviteToken::generate(),
                role,
                expires_at: Utc::now() + self.config.invite_ttl_delta(),
                invited_by: input.invited_by,
            })
            .await?;

        let is_existing_user = self
            .repo
            .find_by_email(invite.email.as_str())
            .await?
            .is_some();

        let notification = InviteNotification {
            email: invite.email.clone(),
            role: invite.role,
            token: invite.token.clone(),
            group_name: group.name,
            is_existing_user,
        };

        if let Err(e) = self.mailer.send_invite(&notification).await {
            if let Err(rollback) = self.repo.delete_invite(invite.id).await {
                tracing::error!(
                    invite_id = %invite.id,
                    error = %rollback,
                    "Failed to roll back undeliverable invite"
                );
            }
            return Err(AuthError::NotificationFailed(e.to_string()));
        }

        tracing::info!(
            invite_id = %invite.id,
            group_id = %invite.group_id,
            role = %invite.role,
            token = %invite.token.fingerprint(),
            "Invite created"
        );

        Ok(invite)
    }
}
