use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Invite lifecycle
///
/// `pending` is the only non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[display("pending")]
    Pending,
    #[display("accepted")]
    Accepted,
    #[display("declined")]
    Declined,
    #[display("expired")]
    Expired,
}

impl InviteStatus {
    #[inline]
    pub const fn code(&self) -> &'static str {
        match self {
            InviteStatus::Pending => "pending",
            InviteStatus::Accepted => "accepted",
            InviteStatus::Declined => "declined",
            InviteStatus::Expired => "expired",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        match code {
            "pending" => Some(InviteStatus::Pending),
            "accepted" => Some(InviteStatus::Accepted),
            "declined" => Some(InviteStatus::Declined),
            "expired" => Some(InviteStatus::Expired),
            _ => None,
        }
    }

    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, InviteStatus::Pending)
    }
}
