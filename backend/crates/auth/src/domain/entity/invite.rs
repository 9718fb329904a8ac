//! Invite Entity

use chrono::{DateTime, Utc};
use kernel::id::{GroupId, InviteId, UserId};

use crate::domain::value_object::{
    email::Email, invite_status::InviteStatus, invite_token::InviteToken,
    member_role::MemberRole,
};

/// Single-use, time-bounded, email-scoped grant of a role in a group
#[derive(Debug, Clone)]
pub struct Invite {
    pub id: InviteId,
    pub group_id: GroupId,
    pub email: Email,
    pub token: InviteToken,
    pub status: InviteStatus,
    pub role: MemberRole,
    pub expires_at: DateTime<Utc>,
    pub invited_by: UserId,
    pub created_at: DateTime<Utc>,
}

impl Invite {
    pub fn is_pending(&self) -> bool {
        self.status == InviteStatus::Pending
    }

    /// An invite is dead from its `expires_at` instant onward
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Values for inserting an invite; always starts `pending`
#[derive(Debug, Clone)]
pub struct NewInvite {
    pub group_id: GroupId,
    pub email: Email,
    pub token: InviteToken,
    pub role: MemberRole,
    pub expires_at: DateTime<Utc>,
    pub invited_by: UserId,
}
