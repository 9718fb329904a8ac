//! Application Configuration
//!
//! Configuration for the Auth application layer.

use std::time::Duration;

use chrono::TimeDelta;
use platform::cookie::CookieConfig;

/// Re-export SameSite from platform
pub use platform::cookie::SameSite;

use crate::application::error_normalizer::{ProviderErrorRule, default_rules};
use crate::domain::value_object::return_path::ReturnPath;

/// Language of user-facing error messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Locale {
    #[default]
    Ja,
    En,
}

impl Locale {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ja" => Some(Locale::Ja),
            "en" => Some(Locale::En),
            _ => None,
        }
    }
}

/// Auth application configuration
#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// Session cookie name
    pub session_cookie_name: String,
    /// Whether to require Secure cookie
    pub cookie_secure: bool,
    /// Cookie Domain attribute
    pub cookie_domain: Option<String>,
    /// SameSite policy
    pub cookie_same_site: SameSite,
    /// Lifetime of minted session artifacts and the cookie carrying them
    pub session_ttl: Duration,
    /// Inactivity after which a valid session is still rejected
    pub idle_timeout: Duration,
    /// Minimum gap between `last_access_at` writes
    pub access_touch_interval: Duration,
    /// Invite validity window
    pub invite_ttl: Duration,
    /// Public base URL of the frontend (no trailing slash)
    pub frontend_base_url: String,
    pub locale: Locale,
    /// Also return the raw provider ID token on login
    pub expose_id_token: bool,
    /// Create a local user the first time a verified provider account is seen
    pub provision_on_first_sight: bool,
    /// Ordered provider error table
    pub provider_error_rules: Vec<ProviderErrorRule>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_cookie_name: "app_session".to_string(),
            cookie_secure: true,
            cookie_domain: None,
            cookie_same_site: SameSite::Lax,
            session_ttl: Duration::from_secs(7 * 24 * 3600), // 1 week
            idle_timeout: Duration::from_secs(30 * 24 * 3600), // 30 days
            access_touch_interval: Duration::from_secs(24 * 3600), // 1 day
            invite_ttl: Duration::from_secs(7 * 24 * 3600),
            frontend_base_url: "http://localhost:3000".to_string(),
            locale: Locale::Ja,
            expose_id_token: false,
            provision_on_first_sight: false,
            provider_error_rules: default_rules(),
        }
    }
}

impl AuthConfig {
    /// Create config for development (insecure cookie)
    pub fn development() -> Self {
        Self {
            cookie_secure: false,
            ..Default::default()
        }
    }

    /// Cookie settings for the session artifact
    pub fn session_cookie(&self) -> CookieConfig {
        CookieConfig {
            name: self.session_cookie_name.clone(),
            secure: self.cookie_secure,
            http_only: true,
            same_site: self.cookie_same_site,
            path: "/".to_string(),
            domain: self.cookie_domain.clone(),
            max_age_secs: Some(self.session_ttl.as_secs() as i64),
        }
    }

    /// Where the verification mail sends the user back to
    pub fn continue_url(&self, return_path: &ReturnPath) -> String {
        let base = self.frontend_base_url.trim_end_matches('/');
        match return_path.as_deref() {
            Some(path) => format!("{base}/login?back-path={}", urlencoding::encode(path)),
            None => format!("{base}/login"),
        }
    }

    pub fn idle_timeout_delta(&self) -> TimeDelta {
        to_delta(self.idle_timeout)
    }

    pub fn access_touch_interval_delta(&self) -> TimeDelta {
        to_delta(self.access_touch_interval)
    }

    pub fn invite_ttl_delta(&self) -> TimeDelta {
        to_delta(self.invite_ttl)
    }
}

// Out-of-range durations saturate; nobody configures a 292-billion-year TTL.
fn to_delta(d: Duration) -> TimeDelta {
    TimeDelta::from_std(d).unwrap_or(TimeDelta::MAX)
}
