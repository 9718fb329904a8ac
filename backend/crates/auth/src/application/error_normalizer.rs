//! Provider Error Normalizer
//!
//! The identity provider reports failures as free-text codes such as
//! `INVALID_LOGIN_CREDENTIALS` or `WEAK_PASSWORD : Password should be at
//! least 6 characters`. They are matched by substring against an ordered
//! rule table (first hit wins) and turned into a stable `(code, message)`
//! pair. The table is configuration; [`default_rules`] is the shipped one.

use std::borrow::Cow;

use kernel::error::kind::ErrorKind;

use crate::application::config::Locale;
use crate::domain::identity::ProviderError;
use crate::error::AuthError;

/// Code for anything the table does not recognise
pub const UNKNOWN: &str = "UNKNOWN";

/// One `(needle, stable code)` mapping
#[derive(Debug, Clone)]
pub struct ProviderErrorRule {
    pub needle: Cow<'static, str>,
    pub code: Cow<'static, str>,
    pub kind: ErrorKind,
}

impl ProviderErrorRule {
    pub const fn new(needle: &'static str, code: &'static str, kind: ErrorKind) -> Self {
        Self {
            needle: Cow::Borrowed(needle),
            code: Cow::Borrowed(code),
            kind,
        }
    }
}

/// Stable, caller-facing form of a provider failure
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedError {
    pub code: Cow<'static, str>,
    pub kind: ErrorKind,
    pub message: Cow<'static, str>,
}

/// Shipped rule table, in match order
pub fn default_rules() -> Vec<ProviderErrorRule> {
    use ErrorKind::*;
    vec![
        ProviderErrorRule::new("EMAIL_EXISTS", "EMAIL_EXISTS", Conflict),
        ProviderErrorRule::new("EMAIL_NOT_FOUND", "EMAIL_NOT_FOUND", Unauthorized),
        ProviderErrorRule::new("INVALID_PASSWORD", "INVALID_PASSWORD", Unauthorized),
        ProviderErrorRule::new(
            "INVALID_LOGIN_CREDENTIALS",
            "INVALID_LOGIN_CREDENTIALS",
            Unauthorized,
        ),
        ProviderErrorRule::new("USER_DISABLED", "USER_DISABLED", Forbidden),
        ProviderErrorRule::new("INVALID_EMAIL", "INVALID_EMAIL", BadRequest),
        ProviderErrorRule::new("WEAK_PASSWORD", "WEAK_PASSWORD", BadRequest),
        ProviderErrorRule::new(
            "TOO_MANY_ATTEMPTS_TRY_LATER",
            "TOO_MANY_ATTEMPTS",
            TooManyRequests,
        ),
    ]
}

/// Which verification-pending message to show
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationNotice {
    /// Login attempted before verifying
    LoginBlocked,
    /// Account just created, mail sent
    SignupPending,
}

/// Rule table + locale
#[derive(Debug, Clone, Copy)]
pub struct ErrorNormalizer<'a> {
    rules: &'a [ProviderErrorRule],
    locale: Locale,
}

impl<'a> ErrorNormalizer<'a> {
    pub fn new(rules: &'a [ProviderErrorRule], locale: Locale) -> Self {
        Self { rules, locale }
    }

    /// Map a raw provider code to its stable form
    ///
    /// The raw text is logged here and nowhere else.
    pub fn normalize(&self, raw: &str) -> NormalizedError {
        let rule = self.rules.iter().find(|rule| raw.contains(rule.needle.as_ref()));

        let (code, kind) = match rule {
            Some(rule) => (rule.code.clone(), rule.kind),
            None => (Cow::Borrowed(UNKNOWN), ErrorKind::Unauthorized),
        };

        tracing::info!(provider_code = %raw, code = %code, "Normalized identity provider error");

        NormalizedError {
            message: localized_message(&code, self.locale),
            code,
            kind,
        }
    }

    /// Convert any provider failure into the crate error
    pub fn provider_error(&self, err: ProviderError) -> AuthError {
        match err {
            ProviderError::Rejected(raw) => AuthError::Provider(self.normalize(&raw)),
            ProviderError::InvalidAssertion(reason) => {
                tracing::debug!(reason = %reason, "Provider assertion rejected");
                AuthError::InvalidSession
            }
            ProviderError::UserNotFound => AuthError::Unauthenticated,
            ProviderError::InvalidRefreshToken(raw) => {
                tracing::info!(provider_code = %raw, "Refresh token rejected");
                AuthError::InvalidRefreshToken
            }
            ProviderError::Unavailable(reason) | ProviderError::InvalidResponse(reason) => {
                AuthError::ProviderUnavailable(reason)
            }
            err @ (ProviderError::MissingServiceCredentials
            | ProviderError::CredentialsUnconfigured) => {
                AuthError::ProviderMisconfigured(err.to_string())
            }
        }
    }

    /// `EMAIL_NOT_VERIFIED` with the message for the given flow
    pub fn email_not_verified(&self, notice: VerificationNotice) -> AuthError {
        let message = match (notice, self.locale) {
            (VerificationNotice::LoginBlocked, Locale::Ja) => {
                "メール認証が完了していません。送信したメールをご確認ください。"
            }
            (VerificationNotice::LoginBlocked, Locale::En) => {
                "Your email address is not verified yet. Please check the mail we sent you."
            }
            (VerificationNotice::SignupPending, Locale::Ja) => {
                "認証メールを送信しました。メール内のリンクをクリックしてからログインしてください。"
            }
            (VerificationNotice::SignupPending, Locale::En) => {
                "We sent you a verification email. Click the link in it, then log in."
            }
        };
        AuthError::EmailNotVerified {
            message: Cow::Borrowed(message),
        }
    }
}

/// Message catalog keyed by stable code
pub fn localized_message(code: &str, locale: Locale) -> Cow<'static, str> {
    let message = match (code, locale) {
        ("EMAIL_EXISTS", Locale::Ja) => "このメールアドレスは既に登録されています",
        ("EMAIL_EXISTS", Locale::En) => "This email address is already registered",
        ("EMAIL_NOT_FOUND", Locale::Ja) => "メールアドレスが見つかりません",
        ("EMAIL_NOT_FOUND", Locale::En) => "No account found for this email address",
        ("INVALID_PASSWORD", Locale::Ja) => "パスワードが違います",
        ("INVALID_PASSWORD", Locale::En) => "Incorrect password",
        ("INVALID_LOGIN_CREDENTIALS", Locale::Ja) => "メールアドレスまたはパスワードが違います",
        ("INVALID_LOGIN_CREDENTIALS", Locale::En) => "Incorrect email address or password",
        ("USER_DISABLED", Locale::Ja) => "このアカウントは無効化されています",
        ("USER_DISABLED", Locale::En) => "This account has been disabled",
        ("INVALID_EMAIL", Locale::Ja) => "メールアドレスの形式が正しくありません",
        ("INVALID_EMAIL", Locale::En) => "The email address is malformed",
        ("WEAK_PASSWORD", Locale::Ja) => "パスワードが弱すぎます（8文字以上推奨）",
        ("WEAK_PASSWORD", Locale::En) => "Password is too weak (8+ characters recommended)",
        ("TOO_MANY_ATTEMPTS", Locale::Ja) => {
            "試行回数が多すぎます。しばらくしてから再試行してください"
        }
        ("TOO_MANY_ATTEMPTS", Locale::En) => "Too many attempts. Please try again later",
        (_, Locale::Ja) => "認証に失敗しました",
        (_, Locale::En) => "Authentication failed",
    };
    Cow::Borrowed(message)
}
