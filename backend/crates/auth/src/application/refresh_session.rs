//! Refresh Session Use Case
//!
//! Rotates the provider refresh token and mints a new session artifact from
//! the resulting ID token. The old refresh token is invalidated by the
//! provider; nothing is tracked here.

use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::error_normalizer::ErrorNormalizer;
use crate::domain::identity::{IdentityProvider, SessionArtifact};
use crate::error::{AuthError, AuthResult};

/// Refresh output
#[derive(Debug)]
pub struct RefreshSessionOutput {
    pub session: SessionArtifact,
    pub refresh_token: String,
    pub id_token: String,
}

/// Refresh session use case
pub struct RefreshSessionUseCase<P>
where
    P: IdentityProvider,
{
    provider: Arc<P>,
    config: Arc<AuthConfig>,
}

impl<P> RefreshSessionUseCase<P>
where
    P: IdentityProvider,
{
    pub fn new(provider: Arc<P>, config: Arc<AuthConfig>) -> Self {
        Self { provider, config }
    }

    pub async fn execute(&self, refresh_token: &str) -> AuthResult<RefreshSessionOutput> {
        let refresh_token = refresh_token.trim();
        if refresh_token.is_empty() {
            return Err(AuthError::MissingRefreshToken);
        }

        let normalizer =
            ErrorNormalizer::new(&self.config.provider_error_rules, self.config.locale);

        let tokens = self
            .provider
            .refresh_token(refresh_token)
            .await
            .map_err(|e| normalizer.provider_error(e))?;

        let session = self
            .provider
            .mint_session_artifact(&tokens.id_token, self.config.session_ttl)
            .await
            .map_err(|e| normalizer.provider_error(e))?;

        tracing::debug!(uid = %tokens.uid, "Session refreshed");

        Ok(RefreshSessionOutput {
            session,
            refresh_token: tokens.refresh_token,
            id_token: tokens.id_token,
        })
    }
}
