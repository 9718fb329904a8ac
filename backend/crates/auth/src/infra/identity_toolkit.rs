//! Identity Toolkit Client
//!
//! [`IdentityProvider`] over the Firebase Auth REST API. Every call is a
//! single bounded-timeout request; nothing is retried. Non-2xx answers
//! carry `{"error": {"message": "<CODE>[ : detail]"}}` and the raw message
//! is handed up unchanged for normalization.

use std::time::Duration;

use platform::http_client::HttpClientConfig;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::domain::identity::{
    IdentityProvider, PasswordSignIn, PasswordSignUp, ProviderError, RefreshedTokens,
    SessionArtifact, VerifiedAssertion,
};
use crate::infra::service_account::{
    DEFAULT_OAUTH_TOKEN_URL, ServiceAccountTokenSource, ServiceCredentials, transport_error,
};
use crate::infra::token_verifier::{
    DEFAULT_ID_TOKEN_KEYS_URL, DEFAULT_SESSION_COOKIE_KEYS_URL, TokenVerifier,
};

pub const DEFAULT_IDENTITY_TOOLKIT_URL: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_SECURE_TOKEN_URL: &str = "https://securetoken.googleapis.com";

/// Refresh endpoint codes that mean "log in again"
const REFRESH_TOKEN_FAILURES: [&str; 6] = [
    "INVALID_REFRESH_TOKEN",
    "TOKEN_EXPIRED",
    "MISSING_REFRESH_TOKEN",
    "USER_NOT_FOUND",
    "USER_DISABLED",
    "INVALID_GRANT_TYPE",
];

/// Connection settings
#[derive(Debug, Clone)]
pub struct IdentityToolkitConfig {
    pub project_id: String,
    /// Web API key, sent as `?key=`
    pub api_key: String,
    pub identity_toolkit_url: String,
    pub secure_token_url: String,
    pub oauth_token_url: String,
    pub id_token_keys_url: String,
    pub session_cookie_keys_url: String,
    pub timeout: Duration,
    pub credentials: Option<ServiceCredentials>,
}

impl IdentityToolkitConfig {
    /// Production endpoints
    pub fn new(project_id: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            project_id: project_id.into(),
            api_key: api_key.into(),
            identity_toolkit_url: DEFAULT_IDENTITY_TOOLKIT_URL.to_string(),
            secure_token_url: DEFAULT_SECURE_TOKEN_URL.to_string(),
            oauth_token_url: DEFAULT_OAUTH_TOKEN_URL.to_string(),
            id_token_keys_url: DEFAULT_ID_TOKEN_KEYS_URL.to_string(),
            session_cookie_keys_url: DEFAULT_SESSION_COOKIE_KEYS_URL.to_string(),
            timeout: platform::http_client::DEFAULT_TIMEOUT,
            credentials: None,
        }
    }
}

/// Firebase Auth REST client
pub struct IdentityToolkitClient {
    http: reqwest::Client,
    project_id: String,
    api_key: String,
    identity_toolkit_url: String,
    secure_token_url: String,
    verifier: TokenVerifier,
    service_tokens: ServiceAccountTokenSource,
}

// ============================================================================
// Wire types
// ============================================================================

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordRequest<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordResponse {
    local_id: String,
    email: String,
    id_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct IdTokenRequest<'a> {
    id_token: &'a str,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    #[serde(default)]
    email_verified: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct OobCodeRequest<'a> {
    request_type: &'static str,
    id_token: &'a str,
    continue_url: &'a str,
}

#[derive(Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    user_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionCookieRequest<'a> {
    id_token: &'a str,
    /// Seconds, as a decimal string
    valid_duration: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionCookieResponse {
    session_cookie: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

// ============================================================================
// Client
// ============================================================================

impl IdentityToolkitClient {
    pub fn new(config: IdentityToolkitConfig) -> Result<Self, ProviderError> {
        let http = HttpClientConfig::with_timeout(config.timeout)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("http client: {e}")))?;

        let credentials = config.credentials.map(|c| match c {
            ServiceCredentials::ServiceAccount {
                client_email,
                private_key,
                token_uri,
            } if token_uri.is_empty() => ServiceCredentials::ServiceAccount {
                client_email,
                private_key,
                token_uri: config.oauth_token_url.clone(),
            },
            other => other,
        });
        let service_tokens = ServiceAccountTokenSource::new(http.clone(), credentials);
        if !service_tokens.is_configured() {
            tracing::warn!("No service credentials configured; session minting will fail");
        }

        Ok(Self {
            verifier: TokenVerifier::new(
                http.clone(),
                config.project_id.clone(),
                config.id_token_keys_url,
                config.session_cookie_keys_url,
            ),
            service_tokens,
            http,
            project_id: config.project_id,
            api_key: config.api_key,
            identity_toolkit_url: config.identity_toolkit_url.trim_end_matches('/').to_string(),
            secure_token_url: config.secure_token_url.trim_end_matches('/').to_string(),
        })
    }

    fn accounts_url(&self, action: &str) -> String {
        format!("{}/v1/accounts:{action}", self.identity_toolkit_url)
    }

    async fn post_json<B, T>(
        &self,
        url: &str,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<T, ProviderError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut request = self.http.post(url).json(body);
        request = match bearer {
            Some(token) => request.bearer_auth(token),
            None => request.query(&[("key", self.api_key.as_str())]),
        };

        let response = request.send().await.map_err(transport_error)?;
        read_response(response).await
    }
}

async fn read_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ProviderError> {
    let status = response.status();
    if status.is_success() {
        return response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()));
    }

    let body = response.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => Err(ProviderError::Rejected(envelope.error.message)),
        Err(_) if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS => {
            Err(ProviderError::Unavailable(format!("provider returned {status}")))
        }
        Err(_) => Err(ProviderError::Rejected(format!("HTTP_{}", status.as_u16()))),
    }
}

impl IdentityProvider for IdentityToolkitClient {
    async fn verify_assertion(&self, token: &str) -> Result<VerifiedAssertion, ProviderError> {
        self.verifier.verify(token).await
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordSignIn, ProviderError> {
        let res: PasswordResponse = self
            .post_json(
                &self.accounts_url("signInWithPassword"),
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
                None,
            )
            .await?;

        Ok(PasswordSignIn {
            uid: res.local_id,
            email: res.email,
            id_token: res.id_token,
            refresh_token: res.refresh_token.unwrap_or_default(),
        })
    }

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordSignUp, ProviderError> {
        let res: PasswordResponse = self
            .post_json(
                &self.accounts_url("signUp"),
                &PasswordRequest {
                    email,
                    password,
                    return_secure_token: true,
                },
                None,
            )
            .await?;

        Ok(PasswordSignUp {
            uid: res.local_id,
            email: res.email,
            id_token: res.id_token,
        })
    }

    async fn lookup_email_verified(&self, id_token: &str) -> Result<bool, ProviderError> {
        let res: LookupResponse = self
            .post_json(&self.accounts_url("lookup"), &IdTokenRequest { id_token }, None)
            .await
            .map_err(|e| match e {
                ProviderError::Rejected(code) if code.contains("USER_NOT_FOUND") => {
                    ProviderError::UserNotFound
                }
                other => other,
            })?;

        res.users
            .first()
            .map(|u| u.email_verified)
            .ok_or(ProviderError::UserNotFound)
    }

    async fn send_verification_email(
        &self,
        id_token: &str,
        continue_url: &str,
    ) -> Result<(), ProviderError> {
        let _: serde_json::Value = self
            .post_json(
                &self.accounts_url("sendOobCode"),
                &OobCodeRequest {
                    request_type: "VERIFY_EMAIL",
                    id_token,
                    continue_url,
                },
                None,
            )
            .await?;

        Ok(())
    }

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, ProviderError> {
        let response = self
            .http
            .post(format!("{}/v1/token", self.secure_token_url))
            .query(&[("key", self.api_key.as_str())])
            .form(&[("grant_type", "refresh_token"), ("refresh_token", refresh_token)])
            .send()
            .await
            .map_err(transport_error)?;

        let res: RefreshResponse = read_response(response).await.map_err(|e| match e {
            ProviderError::Rejected(code)
                if REFRESH_TOKEN_FAILURES.iter().any(|c| code.contains(c)) =>
            {
                ProviderError::InvalidRefreshToken(code)
            }
            other => other,
        })?;

        Ok(RefreshedTokens {
            uid: res.user_id,
            id_token: res.id_token,
            refresh_token: res.refresh_token,
        })
    }

    async fn mint_session_artifact(
        &self,
        id_token: &str,
        ttl: Duration,
    ) -> Result<SessionArtifact, ProviderError> {
        let access_token = match self.service_tokens.access_token().await {
            Err(ProviderError::CredentialsUnconfigured) => {
                return Err(ProviderError::MissingServiceCredentials);
            }
            other => other?,
        };

        let url = format!(
            "{}/v1/projects/{}:createSessionCookie",
            self.identity_toolkit_url, self.project_id
        );
        let res: SessionCookieResponse = self
            .post_json(
                &url,
                &SessionCookieRequest {
                    id_token,
                    valid_duration: ttl.as_secs().to_string(),
                },
                Some(&access_token),
            )
            .await?;

        Ok(SessionArtifact::new(res.session_cookie))
    }

    async fn service_access_token(&self) -> Result<String, ProviderError> {
        self.service_tokens.access_token().await
    }
}
