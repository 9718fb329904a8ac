//! Sign In Use Case
//!
//! Password login against the identity provider. A session artifact is
//! only minted once the provider confirms the email address is verified;
//! until then the caller gets `EMAIL_NOT_VERIFIED` and a fresh
//! verification mail.

use std::sync::Arc;

use chrono::Utc;

use crate::application::config::AuthConfig;
use crate::application::error_normalizer::{ErrorNormalizer, VerificationNotice};
use crate::domain::entity::user::{NewUser, User};
use crate::domain::identity::{IdentityProvider, SessionArtifact};
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, return_path::ReturnPath};
use crate::error::{AuthError, AuthResult};

/// Sign in input
pub struct SignInInput {
    pub email: String,
    pub password: String,
    /// Where the verification mail should send the user back to
    pub return_path: Option<String>,
}

/// Sign in output
#[derive(Debug)]
pub struct SignInOutput {
    pub user: User,
    /// Value for the session cookie
    pub session: SessionArtifact,
    pub refresh_token: String,
    pub id_token: String,
}

/// Sign in use case
pub struct SignInUseCase<U, P>
where
    U: UserRepository,
    P: IdentityProvider,
{
    user_repo: Arc<U>,
    provider: Arc<P>,
    config: Arc<AuthConfig>,
}

impl<U, P> SignInUseCase<U, P>
where
    U: UserRepository,
    P: IdentityProvider,
{
    pub fn new(user_repo: Arc<U>, provider: Arc<P>, config: Arc<AuthConfig>) -> Self {
        Self {
            user_repo,
            provider,
            config,
        }
    }

    pub async fn execute(&self, input: SignInInput) -> AuthResult<SignInOutput> {
        let normalizer =
            ErrorNormalizer::new(&self.config.provider_error_rules, self.config.locale);

        // Provider first; nothing local is touched on failure
        let signed_in = self
            .provider
            .sign_in_with_password(input.email.trim(), &input.password)
            .await
            .map_err(|e| normalizer.provider_error(e))?;

        let verified = self
            .provider
            .lookup_email_verified(&signed_in.id_token)
            .await
            .map_err(|e| normalizer.provider_error(e))?;

        if !verified {
            let return_path = ReturnPath::sanitize(input.return_path.as_deref());
            let continue_url = self.config.continue_url(&return_path);

            if let Err(e) = self
                .provider
                .send_verification_email(&signed_in.id_token, &continue_url)
                .await
            {
                tracing::warn!(uid = %signed_in.uid, error = %e, "Verification email not sent");
            }

            tracing::info!(uid = %signed_in.uid, "Login blocked until email is verified");
            return Err(normalizer.email_not_verified(VerificationNotice::LoginBlocked));
        }

        let user = self.ensure_user(&signed_in.uid, &signed_in.email).await?;

        let session = self
            .provider
            .mint_session_artifact(&signed_in.id_token, self.config.session_ttl)
            .await
            .map_err(|e| normalizer.provider_error(e))?;

        // A fresh login restarts the idle clock
        let now = Utc::now();
        let user = match self.user_repo.touch_last_access(user.id, now).await {
            Ok(()) => User {
                last_access_at: Some(now),
                ..user
            },
            Err(e) => {
                tracing::warn!(user_id = %user.id, error = %e, "Failed to record login time");
                user
            }
        };

        tracing::info!(user_id = %user.id, "User signed in");

        Ok(SignInOutput {
            user,
            session,
            refresh_token: signed_in.refresh_token,
            id_token: signed_in.id_token,
        })
    }

    /// Resolve the local user for a verified provider account, creating it
    /// on first login
    async fn ensure_user(&self, uid: &str, email: &str) -> AuthResult<User> {
        if let Some(user) = self.user_repo.find_by_provider_uid(uid).await? {
            return Ok(user);
        }

        // Same address under another provider UID: refuse rather than link
        if self.user_repo.find_by_email(email).await?.is_some() {
            tracing::warn!(uid = %uid, "Email already owned by a different identity");
            return Err(AuthError::IdentityConflict);
        }

        let email = Email::new(email)?;
        match self.user_repo.create(&NewUser::member(uid, email, "")).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Local user created on first login");
                Ok(user)
            }
            // Lost a race against a concurrent first login for the same account
            Err(AuthError::EmailExists | AuthError::IdentityConflict) => self
                .user_repo
                .find_by_provider_uid(uid)
                .await?
                .ok_or(AuthError::IdentityConflict),
            Err(e) => Err(e),
        }
    }
}
