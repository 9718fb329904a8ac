use derive_more::Display;
use serde::{Deserialize, Serialize};

use crate::error::{AuthError, AuthResult};

/// Role held within a single group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberRole {
    #[display("manager")]
    Manager,
    #[default]
    #[display("member")]
    Member,
}

impl MemberRole {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            MemberRole::Manager => "manager",
            MemberRole::Member => "member",
        }
    }

    #[inline]
    pub const fn is_manager(&self) -> bool {
        matches!(self, MemberRole::Manager)
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "manager" => Some(MemberRole::Manager),
            "member" => Some(MemberRole::Member),
            _ => None,
        }
    }

    /// Role requested for an invite; blank means `member`
    pub fn parse_invite_role(raw: &str) -> AuthResult<Self> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Ok(MemberRole::Member);
        }
        Self::from_code(raw).ok_or_else(|| AuthError::InvalidRole(raw.to_string()))
    }

    /// Label shown in invite mail
    pub const fn label_ja(&self) -> &'static str {
        match self {
            MemberRole::Manager => "グループ管理者",
            MemberRole::Member => "通常メンバー",
        }
    }
}
