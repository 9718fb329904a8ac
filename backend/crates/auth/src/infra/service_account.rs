//! Service Account Access Tokens
//!
//! Privileged provider endpoints (session cookie minting) are called as the
//! application itself. The access token comes from a JWT-bearer exchange
//! signed with the service account key, or from a static token supplied
//! by the environment. Exchanged tokens are cached until shortly before
//! they expire.

use std::time::{Duration, Instant};

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use platform::http_client::is_transient;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::domain::identity::ProviderError;

/// Google OAuth2 token endpoint
pub const DEFAULT_OAUTH_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

const SCOPES: &str = "https://www.googleapis.com/auth/identitytoolkit https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME_SECS: i64 = 3600;
/// Refresh this long before the provider-reported expiry
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Credential material for service-to-service calls
#[derive(Clone)]
pub enum ServiceCredentials {
    /// Service account key, exchanged for access tokens on demand
    ServiceAccount {
        client_email: String,
        /// PEM-encoded RSA private key
        private_key: String,
        token_uri: String,
    },
    /// Pre-issued access token used as is
    Static(String),
}

impl std::fmt::Debug for ServiceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceCredentials::ServiceAccount { client_email, .. } => f
                .debug_struct("ServiceAccount")
                .field("client_email", client_email)
                .finish_non_exhaustive(),
            ServiceCredentials::Static(_) => f.write_str("Static(<redacted>)"),
        }
    }
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
}

struct CachedToken {
    token: String,
    refresh_at: Instant,
}

/// Hands out service access tokens
pub struct ServiceAccountTokenSource {
    http: reqwest::Client,
    credentials: Option<ServiceCredentials>,
    cache: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokenSource {
    pub fn new(http: reqwest::Client, credentials: Option<ServiceCredentials>) -> Self {
        Self {
            http,
            credentials,
            cache: Mutex::new(None),
        }
    }

    pub fn is_configured(&self) -> bool {
        self.credentials.is_some()
    }

    pub async fn access_token(&self) -> Result<String, ProviderError> {
        let (client_email, private_key, token_uri) = match &self.credentials {
            None => return Err(ProviderError::CredentialsUnconfigured),
            Some(ServiceCredentials::Static(token)) => return Ok(token.clone()),
            Some(ServiceCredentials::ServiceAccount {
                client_email,
                private_key,
                token_uri,
            }) => (client_email, private_key, token_uri),
        };

        // Held across the exchange so concurrent callers share one request
        let mut cache = self.cache.lock().await;
        if let Some(cached) = cache.as_ref() {
            if Instant::now() < cached.refresh_at {
                return Ok(cached.token.clone());
            }
        }

        let assertion = sign_assertion(client_email, private_key, token_uri)?;

        let response = self
            .http
            .post(token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Service account token exchange failed");
            return Err(if status.is_server_error() {
                ProviderError::Unavailable(format!("token endpoint returned {status}"))
            } else {
                ProviderError::MissingServiceCredentials
            });
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let lifetime = Duration::from_secs(token.expires_in.unwrap_or(3600));
        *cache = Some(CachedToken {
            token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(EXPIRY_MARGIN),
        });

        tracing::debug!(expires_in_secs = lifetime.as_secs(), "Service access token refreshed");
        Ok(token.access_token)
    }
}

fn sign_assertion(
    client_email: &str,
    private_key: &str,
    token_uri: &str,
) -> Result<String, ProviderError> {
    let key = EncodingKey::from_rsa_pem(private_key.as_bytes()).map_err(|e| {
        tracing::error!(error = %e, "Service account private key is unusable");
        ProviderError::MissingServiceCredentials
    })?;

    let iat = Utc::now().timestamp();
    let claims = AssertionClaims {
        iss: client_email,
        scope: SCOPES,
        aud: token_uri,
        iat,
        exp: iat + ASSERTION_LIFETIME_SECS,
    };

    jsonwebtoken::encode(&Header::new(Algorithm::RS256), &claims, &key)
        .map_err(|_| ProviderError::MissingServiceCredentials)
}

pub(crate) fn transport_error(err: reqwest::Error) -> ProviderError {
    if is_transient(&err) {
        ProviderError::Unavailable(err.to_string())
    } else {
        ProviderError::InvalidResponse(err.to_string())
    }
}
