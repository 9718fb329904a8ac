//! Group and GroupMembership
//!
//! Groups themselves are managed elsewhere; this crate only reads their
//! names and owns the membership rows created by invite acceptance.

use chrono::{DateTime, Utc};
use kernel::id::{GroupId, UserId};

use crate::domain::value_object::member_role::MemberRole;

#[derive(Debug, Clone)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// At most one per (group, user)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupMembership {
    pub group_id: GroupId,
    pub user_id: UserId,
    pub role: MemberRole,
    pub joined_at: DateTime<Utc>,
}

impl GroupMembership {
    pub fn is_manager(&self) -> bool {
        self.role.is_manager()
    }
}
