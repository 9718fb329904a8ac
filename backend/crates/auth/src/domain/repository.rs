//! Repository Traits
//!
//! Interfaces for data persistence. Implementation is in infrastructure layer.
//!
//! Uniqueness (`users.provider_uid`, `users.email`, `invites.token`,
//! `group_members (group_id, user_id)`) is enforced by the store; the
//! implementations translate violations into the matching [`AuthError`]
//! variant instead of a generic database error.
//!
//! [`AuthError`]: crate::error::AuthError

use chrono::{DateTime, Utc};
use kernel::id::{GroupId, InviteId, UserId};

use crate::domain::entity::{
    group::{Group, GroupMembership},
    invite::{Invite, NewInvite},
    user::{NewUser, User},
};
use crate::domain::value_object::{invite_status::InviteStatus, invite_token::InviteToken};
use crate::error::AuthResult;

/// User repository trait
#[trait_variant::make(UserRepository: Send)]
pub trait LocalUserRepository {
    async fn find_by_provider_uid(&self, provider_uid: &str) -> AuthResult<Option<User>>;

    /// Exact (case-sensitive) match
    async fn find_by_email(&self, email: &str) -> AuthResult<Option<User>>;

    /// Insert a user
    ///
    /// Fails with `EmailExists` / `IdentityConflict` when the email or
    /// provider UID is already taken.
    async fn create(&self, user: &NewUser) -> AuthResult<User>;

    async fn touch_last_access(&self, id: UserId, at: DateTime<Utc>) -> AuthResult<()>;
}

/// Group lookup (groups are owned by another context)
#[trait_variant::make(GroupRepository: Send)]
pub trait LocalGroupRepository {
    async fn find_group(&self, id: GroupId) -> AuthResult<Option<Group>>;
}

/// Membership lookup
#[trait_variant::make(MembershipRepository: Send)]
pub trait LocalMembershipRepository {
    async fn find_membership(
        &self,
        group_id: GroupId,
        user_id: UserId,
    ) -> AuthResult<Option<GroupMembership>>;
}

/// Invite repository trait
#[trait_variant::make(InviteRepository: Send)]
pub trait LocalInviteRepository {
    async fn create_invite(&self, invite: &NewInvite) -> AuthResult<Invite>;

    async fn find_by_token(&self, token: &InviteToken) -> AuthResult<Option<Invite>>;

    /// Newest first
    async fn list_by_group(&self, group_id: GroupId) -> AuthResult<Vec<Invite>>;

    /// Unconditional delete (rollback of an undeliverable invite)
    async fn delete_invite(&self, id: InviteId) -> AuthResult<()>;

    /// Delete only if the invite belongs to `group_id`; returns whether a row went away
    async fn delete_in_group(&self, id: InviteId, group_id: GroupId) -> AuthResult<bool>;

    /// `UPDATE ... SET status = $to WHERE id = $id AND status = 'pending'`
    ///
    /// Returns `false` when the invite was no longer pending.
    async fn transition_from_pending(&self, id: InviteId, to: InviteStatus) -> AuthResult<bool>;

    /// Consume a pending invite and create the membership in one transaction
    ///
    /// Fails with `AlreadyUsed` if another request consumed the invite
    /// first, and with `AlreadyMember` if the membership row already exists.
    async fn accept_invite(
        &self,
        invite: &Invite,
        user_id: UserId,
        joined_at: DateTime<Utc>,
    ) -> AuthResult<GroupMembership>;
}
