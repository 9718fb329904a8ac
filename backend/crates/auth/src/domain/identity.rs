//! Identity Provider Port
//!
//! Everything the core needs from the external identity service. The
//! production adapter lives in `infra::identity_toolkit`; tests use fakes.
//!
//! None of these calls are retried here. Transport failures come back as
//! [`ProviderError::Unavailable`] and the caller decides.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

/// Claims of a verified bearer token or session cookie
#[derive(Debug, Clone)]
pub struct VerifiedAssertion {
    pub uid: String,
    pub email: Option<String>,
    pub email_verified: bool,
}

/// Successful password sign-in
#[derive(Clone)]
pub struct PasswordSignIn {
    pub uid: String,
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
}

/// Successful password sign-up
#[derive(Clone)]
pub struct PasswordSignUp {
    pub uid: String,
    pub email: String,
    pub id_token: String,
}

/// Result of refresh-token rotation
#[derive(Clone)]
pub struct RefreshedTokens {
    pub uid: String,
    pub id_token: String,
    pub refresh_token: String,
}

/// Provider-signed session cookie value
#[derive(Clone, PartialEq, Eq)]
pub struct SessionArtifact(String);

impl SessionArtifact {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

macro_rules! redacted_debug {
    ($($ty:ident),*) => {$(
        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(concat!(stringify!($ty), "(<redacted>)"))
            }
        }
    )*};
}

redacted_debug!(PasswordSignIn, PasswordSignUp, RefreshedTokens, SessionArtifact);

/// Identity provider failures
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Token malformed, expired, or badly signed
    #[error("invalid assertion: {0}")]
    InvalidAssertion(String),

    /// Non-2xx answer; carries the provider's raw error code
    #[error("provider rejected request: {0}")]
    Rejected(String),

    #[error("provider user not found")]
    UserNotFound,

    #[error("invalid refresh token: {0}")]
    InvalidRefreshToken(String),

    /// A privileged call was attempted without a service token
    #[error("service credentials missing for privileged call")]
    MissingServiceCredentials,

    /// No service credential material was supplied at startup
    #[error("service credentials are not configured")]
    CredentialsUnconfigured,

    /// Timeout or connection failure
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    /// 2xx with a body we could not understand
    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}

/// Identity provider port
#[trait_variant::make(IdentityProvider: Send)]
pub trait LocalIdentityProvider {
    /// Verify a provider ID token or session cookie
    async fn verify_assertion(&self, token: &str) -> Result<VerifiedAssertion, ProviderError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordSignIn, ProviderError>;

    async fn sign_up_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<PasswordSignUp, ProviderError>;

    async fn lookup_email_verified(&self, id_token: &str) -> Result<bool, ProviderError>;

    async fn send_verification_email(
        &self,
        id_token: &str,
        continue_url: &str,
    ) -> Result<(), ProviderError>;

    async fn refresh_token(&self, refresh_token: &str) -> Result<RefreshedTokens, ProviderError>;

    /// Exchange an ID token for a session cookie valid for `ttl`
    async fn mint_session_artifact(
        &self,
        id_token: &str,
        ttl: Duration,
    ) -> Result<SessionArtifact, ProviderError>;

    /// Access token for calling privileged endpoints as the application
    async fn service_access_token(&self) -> Result<String, ProviderError>;
}
