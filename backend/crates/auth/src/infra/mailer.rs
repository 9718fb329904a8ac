//! Invite Mail Delivery
//!
//! Renders the invite mail (built-in Japanese body or an operator-supplied
//! text template) and delivers it through Amazon SES v2. A logging mailer
//! stands in for local development.

use aws_config::BehaviorVersion;
use aws_sdk_sesv2::Client as SesClient;
use aws_sdk_sesv2::config::Region;
use aws_sdk_sesv2::types::{Body, Content, Destination, EmailContent, Message};

use crate::domain::mailer::{InviteMailer, InviteNotification, MailerError};

const SUBJECT: &str = "グループ招待のお知らせ";

/// Rendered invite mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedInvite {
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Mail body renderer
///
/// Custom templates may use `{{INVITE_URL}}`, `{{ROLE}}`, `{{EMAIL}}`,
/// `{{GROUP_NAME}}` and `{{INVITE_TYPE}}` (`new` / `existing`).
#[derive(Debug, Clone)]
pub struct InviteTemplate {
    frontend_base_url: String,
    text_template: Option<String>,
}

impl InviteTemplate {
    pub fn new(frontend_base_url: &str, text_template: Option<String>) -> Self {
        Self {
            frontend_base_url: frontend_base_url.trim_end_matches('/').to_string(),
            text_template: text_template
                .map(|t| t.trim().to_string())
                .filter(|t| !t.is_empty()),
        }
    }

    /// Load the optional template from disk
    pub fn from_path(frontend_base_url: &str, path: Option<&str>) -> Result<Self, MailerError> {
        let text_template = match path {
            Some(path) => Some(
                std::fs::read_to_string(path)
                    .map_err(|e| MailerError::Build(format!("invite template {path}: {e}")))?,
            ),
            None => None,
        };
        Ok(Self::new(frontend_base_url, text_template))
    }

    pub fn render(&self, n: &InviteNotification) -> RenderedInvite {
        let invite_url = format!("{}/invites/{}", self.frontend_base_url, n.token.as_str());
        let role = n.role.label_ja();

        let text = match &self.text_template {
            Some(template) => template
                .replace("{{INVITE_URL}}", &invite_url)
                .replace("{{ROLE}}", role)
                .replace("{{EMAIL}}", n.email.as_str())
                .replace("{{GROUP_NAME}}", &n.group_name)
                .replace(
                    "{{INVITE_TYPE}}",
                    if n.is_existing_user { "existing" } else { "new" },
                ),
            None => {
                let lead = if n.is_existing_user {
                    "既存アカウントへのグループ追加の確認依頼です。"
                } else {
                    "新規アカウント登録後にグループへ参加できます。"
                };
                format!(
                    "{lead}\n\nグループ名: {}\n招待リンク: {invite_url}\n権限: {role}\n\nこのメールに心当たりがない場合は破棄してください。",
                    n.group_name
                )
            }
        };

        RenderedInvite {
            subject: SUBJECT.to_string(),
            html: text_to_html(&text),
            text,
        }
    }
}

fn text_to_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len() + 32);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            '\n' => escaped.push_str("<br>"),
            c => escaped.push(c),
        }
    }
    format!("<pre style=\"font-family: inherit;\">{escaped}</pre>")
}

// ============================================================================
// SES
// ============================================================================

/// SES v2 mailer
pub struct SesInviteMailer {
    client: SesClient,
    from: String,
    template: InviteTemplate,
}

impl SesInviteMailer {
    /// Build a client from the default AWS credential chain
    pub async fn new(region: &str, from: impl Into<String>, template: InviteTemplate) -> Self {
        let aws_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(region.to_string()))
            .load()
            .await;

        Self {
            client: SesClient::new(&aws_config),
            from: from.into(),
            template,
        }
    }
}

fn utf8(data: String) -> Result<Content, MailerError> {
    Content::builder()
        .data(data)
        .charset("UTF-8")
        .build()
        .map_err(|e| MailerError::Build(e.to_string()))
}

impl InviteMailer for SesInviteMailer {
    async fn send_invite(&self, notification: &InviteNotification) -> Result<(), MailerError> {
        let mail = self.template.render(notification);

        let destination = Destination::builder()
            .to_addresses(notification.email.as_str())
            .build();

        let message = Message::builder()
            .subject(utf8(mail.subject)?)
            .body(
                Body::builder()
                    .text(utf8(mail.text)?)
                    .html(utf8(mail.html)?)
                    .build(),
            )
            .build();

        let result = self
            .client
            .send_email()
            .from_email_address(&self.from)
            .destination(destination)
            .content(EmailContent::builder().simple(message).build())
            .send()
            .await
            .map_err(|e| MailerError::Delivery(e.to_string()))?;

        tracing::info!(
            message_id = ?result.message_id(),
            token = %notification.token.fingerprint(),
            "Invite mail sent via SES"
        );
        Ok(())
    }
}

// ============================================================================
// Logging (development)
// ============================================================================

/// Logs invite metadata instead of sending
///
/// The body carries the invite link, so only the token fingerprint is logged.
pub struct LogInviteMailer {
    template: InviteTemplate,
}

impl LogInviteMailer {
    pub fn new(template: InviteTemplate) -> Self {
        Self { template }
    }
}

impl InviteMailer for LogInviteMailer {
    async fn send_invite(&self, notification: &InviteNotification) -> Result<(), MailerError> {
        let mail = self.template.render(notification);
        tracing::info!(
            to = %notification.email,
            subject = %mail.subject,
            group = %notification.group_name,
            token = %notification.token.fingerprint(),
            "Invite mail (not sent, SES not configured)"
        );
        Ok(())
    }
}

/// Mailer picked at startup
pub enum AppMailer {
    Ses(SesInviteMailer),
    Log(LogInviteMailer),
}

impl InviteMailer for AppMailer {
    async fn send_invite(&self, notification: &InviteNotification) -> Result<(), MailerError> {
        match self {
            AppMailer::Ses(m) => m.send_invite(notification).await,
            AppMailer::Log(m) => m.send_invite(notification).await,
        }
    }
}
