//! Server configuration from the environment

use std::time::Duration;

use auth::application::config::Locale;
use auth::infra::identity_toolkit::{DEFAULT_IDENTITY_TOOLKIT_URL, DEFAULT_SECURE_TOKEN_URL};
use auth::infra::service_account::DEFAULT_OAUTH_TOKEN_URL;
use auth::infra::token_verifier::{DEFAULT_ID_TOKEN_KEYS_URL, DEFAULT_SESSION_COOKIE_KEYS_URL};
use auth::infra::{IdentityToolkitConfig, ServiceCredentials};
use auth::AuthConfig;
use platform::config::{
    ConfigError, env_bool, env_list, env_opt, env_or, env_parse, env_required, env_secs,
    normalize_pem,
};
use platform::cookie::SameSite;

/// Invite mail delivery settings
#[derive(Debug, Clone)]
pub struct MailConfig {
    /// SES sender; `None` means invites are only logged
    pub ses_from: Option<String>,
    pub aws_region: String,
    pub template_path: Option<String>,
}

#[derive(Debug)]
pub struct ServerConfig {
    pub port: u16,
    pub database_url: String,
    pub database_max_connections: u32,
    pub frontend_origins: Vec<String>,
    pub provider: IdentityToolkitConfig,
    pub auth: AuthConfig,
    pub mail: MailConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = AuthConfig::default();

        let locale = match env_opt("AUTH_LOCALE") {
            None => defaults.locale,
            Some(raw) => Locale::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                name: "AUTH_LOCALE".into(),
                reason: format!("expected ja or en, got {raw:?}"),
            })?,
        };

        let cookie_same_site = match env_opt("COOKIE_SAME_SITE") {
            None => defaults.cookie_same_site,
            Some(raw) => SameSite::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                name: "COOKIE_SAME_SITE".into(),
                reason: format!("expected strict, lax or none, got {raw:?}"),
            })?,
        };

        let auth = AuthConfig {
            session_cookie_name: env_or("SESSION_COOKIE_NAME", &defaults.session_cookie_name),
            cookie_secure: env_bool("COOKIE_SECURE", defaults.cookie_secure)?,
            cookie_domain: env_opt("COOKIE_DOMAIN"),
            cookie_same_site,
            session_ttl: env_secs("SESSION_TTL_SECS", defaults.session_ttl)?,
            idle_timeout: env_secs("IDLE_TIMEOUT_SECS", defaults.idle_timeout)?,
            access_touch_interval: env_secs(
                "ACCESS_TOUCH_INTERVAL_SECS",
                defaults.access_touch_interval,
            )?,
            invite_ttl: env_secs("INVITE_TTL_SECS", defaults.invite_ttl)?,
            frontend_base_url: env_required("FRONTEND_BASE_URL")?,
            locale,
            expose_id_token: env_bool("EXPOSE_ID_TOKEN", defaults.expose_id_token)?,
            provision_on_first_sight: env_bool(
                "PROVISION_ON_FIRST_SIGHT",
                defaults.provision_on_first_sight,
            )?,
            provider_error_rules: defaults.provider_error_rules,
        };

        let oauth_token_url = env_or("OAUTH_TOKEN_URL", DEFAULT_OAUTH_TOKEN_URL);
        let provider = IdentityToolkitConfig {
            project_id: env_required("FIREBASE_PROJECT_ID")?,
            api_key: env_required("FIREBASE_API_KEY")?,
            identity_toolkit_url: env_or("IDENTITY_TOOLKIT_URL", DEFAULT_IDENTITY_TOOLKIT_URL),
            secure_token_url: env_or("SECURE_TOKEN_URL", DEFAULT_SECURE_TOKEN_URL),
            id_token_keys_url: env_or("ID_TOKEN_KEYS_URL", DEFAULT_ID_TOKEN_KEYS_URL),
            session_cookie_keys_url: env_or(
                "SESSION_COOKIE_KEYS_URL",
                DEFAULT_SESSION_COOKIE_KEYS_URL,
            ),
            timeout: env_secs("PROVIDER_TIMEOUT_SECS", Duration::from_secs(10))?,
            credentials: service_credentials(&oauth_token_url),
            oauth_token_url,
        };

        Ok(Self {
            port: env_parse("APP_PORT", 8080)?,
            database_url: env_required("DATABASE_URL")?,
            database_max_connections: env_parse("DATABASE_MAX_CONNECTIONS", 5)?,
            frontend_origins: env_list("FRONTEND_ORIGINS", "http://localhost:3000"),
            provider,
            auth,
            mail: MailConfig {
                ses_from: env_opt("SES_FROM_EMAIL"),
                aws_region: env_or("AWS_REGION", "ap-northeast-1"),
                template_path: env_opt("INVITE_TEMPLATE_PATH"),
            },
        })
    }
}

/// Service account first, then a static token, else none
fn service_credentials(token_uri: &str) -> Option<ServiceCredentials> {
    if let (Some(client_email), Some(private_key)) = (
        env_opt("FIREBASE_CLIENT_EMAIL"),
        env_opt("FIREBASE_PRIVATE_KEY"),
    ) {
        return Some(ServiceCredentials::ServiceAccount {
            client_email,
            private_key: normalize_pem(&private_key),
            token_uri: token_uri.to_string(),
        });
    }

    env_opt("FIREBASE_SERVICE_TOKEN").map(ServiceCredentials::Static)
}
