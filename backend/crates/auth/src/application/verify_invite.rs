//! Verify Invite Use Case
//!
//! Anonymous lookup of an invite by its token. Read-only unless the invite
//! turns out to be past its deadline, in which case the `expired` status is
//! persisted on the way out.

use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::domain::entity::{group::Group, invite::Invite};
use crate::domain::repository::{GroupRepository, InviteRepository, UserRepository};
use crate::domain::value_object::{invite_status::InviteStatus, invite_token::InviteToken};
use crate::error::{AuthError, AuthResult};

/// What the invite landing page shows
#[derive(Debug)]
pub struct InviteView {
    pub invite: Invite,
    pub group_name: String,
    /// Whether the invitee already has an account (login vs. signup)
    pub user_exists: bool,
}

/// Look up a pending, unexpired invite
///
/// Shared with accept/decline so all three agree on what "valid" means.
pub(crate) async fn find_valid_invite<R>(
    repo: &R,
    raw_token: &str,
    now: DateTime<Utc>,
) -> AuthResult<Invite>
where
    R: InviteRepository,
{
    let invite = find_invite(repo, raw_token).await?;
    ensure_usable(repo, &invite, now).await?;
    Ok(invite)
}

pub(crate) async fn find_invite<R>(repo: &R, raw_token: &str) -> AuthResult<Invite>
where
    R: InviteRepository,
{
    let token = InviteToken::parse(raw_token).ok_or(AuthError::InvalidToken)?;
    repo.find_by_token(&token)
        .await?
        .ok_or(AuthError::InvalidToken)
}

/// `AlreadyUsed` for any non-pending status, `Expired` from `expires_at` on
pub(crate) async fn ensure_usable<R>(repo: &R, invite: &Invite, now: DateTime<Utc>) -> AuthResult<()>
where
    R: InviteRepository,
{
    if !invite.is_pending() {
        return Err(AuthError::AlreadyUsed);
    }

    if invite.is_expired_at(now) {
        if repo
            .transition_from_pending(invite.id, InviteStatus::Expired)
            .await?
        {
            tracing::info!(invite_id = %invite.id, "Invite marked expired");
        }
        return Err(AuthError::Expired);
    }

    Ok(())
}

/// Verify invite use case
pub struct VerifyInviteUseCase<R>
where
    R: InviteRepository + GroupRepository + UserRepository,
{
    repo: Arc<R>,
}

impl<R> VerifyInviteUseCase<R>
where
    R: InviteRepository + GroupRepository + UserRepository,
{
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn execute(&self, token: &str) -> AuthResult<Invite> {
        find_valid_invite(self.repo.as_ref(), token, Utc::now()).await
    }

    /// [`execute`](Self::execute) plus group name and account existence
    pub async fn view(&self, token: &str) -> AuthResult<InviteView> {
        let invite = self.execute(token).await?;

        let group_name = self
            .repo
            .find_group(invite.group_id)
            .await?
            .map(|Group { name, .. }| name)
            .unwrap_or_default();

        let user_exists = self
            .repo
            .find_by_email(invite.email.as_str())
            .await?
            .is_some();

        Ok(InviteView {
            invite,
            group_name,
            user_exists,
        })
    }
}
