//! Invite Mailer Port

use thiserror::Error;

use crate::domain::value_object::{
    email::Email, invite_token::InviteToken, member_role::MemberRole,
};

/// Everything the mail needs; the link is built by the mailer
#[derive(Debug, Clone)]
pub struct InviteNotification {
    pub email: Email,
    pub role: MemberRole,
    pub token: InviteToken,
    pub group_name: String,
    /// Whether a local account already exists for `email`
    pub is_existing_user: bool,
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),

    #[error("mail could not be built: {0}")]
    Build(String),
}

/// Outbound invite delivery
#[trait_variant::make(InviteMailer: Send)]
pub trait LocalInviteMailer {
    async fn send_invite(&self, notification: &InviteNotification) -> Result<(), MailerError>;
}
