//! API DTOs (Data Transfer Objects)

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::InviteView;
use crate::domain::entity::{group::GroupMembership, invite::Invite, user::User};

// ============================================================================
// Session
// ============================================================================

/// Login request
#[derive(Debug, Clone, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Path to come back to after email verification
    #[serde(default)]
    pub back_path: Option<String>,
}

/// Signup request
#[derive(Debug, Clone, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub back_path: Option<String>,
}

/// Login response
#[derive(Debug, Clone, Serialize)]
pub struct AuthResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: String,
    /// Session artifact, also set as cookie
    pub token: String,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshRequest {
    #[serde(default)]
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshResponse {
    pub token: String,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
}

/// Current user
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: i64,
    pub email: String,
    pub display_name: String,
    pub role: String,
    pub last_access_at: Option<DateTime<Utc>>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.as_i64(),
            email: user.email.as_str().to_string(),
            display_name: user.display_name.clone(),
            role: user.role.code().to_string(),
            last_access_at: user.last_access_at,
        }
    }
}

// ============================================================================
// Invites
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct CreateInviteRequest {
    pub email: String,
    #[serde(default)]
    pub role: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateInviteResponse {
    pub id: i64,
    pub token: String,
    pub email: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
}

impl From<&Invite> for CreateInviteResponse {
    fn from(invite: &Invite) -> Self {
        Self {
            id: invite.id.as_i64(),
            token: invite.token.as_str().to_string(),
            email: invite.email.as_str().to_string(),
            role: invite.role.code().to_string(),
            expires_at: invite.expires_at,
        }
    }
}

/// Public invite landing data
#[derive(Debug, Clone, Serialize)]
pub struct VerifyInviteResponse {
    pub email: String,
    pub expires_at: DateTime<Utc>,
    pub status: String,
    pub group_id: i64,
    pub group_name: String,
    pub role: String,
    pub user_exists: bool,
}

impl From<InviteView> for VerifyInviteResponse {
    fn from(view: InviteView) -> Self {
        Self {
            email: view.invite.email.into_db(),
            expires_at: view.invite.expires_at,
            status: view.invite.status.code().to_string(),
            group_id: view.invite.group_id.as_i64(),
            group_name: view.group_name,
            role: view.invite.role.code().to_string(),
            user_exists: view.user_exists,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct InviteListItem {
    pub id: i64,
    pub email: String,
    pub token: String,
    pub status: String,
    pub role: String,
    pub expires_at: DateTime<Utc>,
    pub invited_by: i64,
    pub created_at: DateTime<Utc>,
}

impl From<Invite> for InviteListItem {
    fn from(invite: Invite) -> Self {
        Self {
            id: invite.id.as_i64(),
            email: invite.email.into_db(),
            token: invite.token.as_str().to_string(),
            status: invite.status.code().to_string(),
            role: invite.role.code().to_string(),
            expires_at: invite.expires_at,
            invited_by: invite.invited_by.as_i64(),
            created_at: invite.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MembershipResponse {
    pub group_id: i64,
    pub user_id: i64,
    pub role: String,
    pub joined_at: DateTime<Utc>,
}

impl From<GroupMembership> for MembershipResponse {
    fn from(m: GroupMembership) -> Self {
        Self {
            group_id: m.group_id.as_i64(),
            user_id: m.user_id.as_i64(),
            role: m.role.code().to_string(),
            joined_at: m.joined_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
}
