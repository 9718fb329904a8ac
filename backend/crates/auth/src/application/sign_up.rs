//! Sign Up Use Case
//!
//! Creates the provider account and its local user, then asks the provider
//! to send a verification mail. Sign-up never yields a session: the only
//! non-error outcome is unreachable, and success is reported as
//! `EMAIL_NOT_VERIFIED` with a "check your inbox" message.

use std::convert::Infallible;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::error_normalizer::{ErrorNormalizer, VerificationNotice};
use crate::domain::entity::user::NewUser;
use crate::domain::identity::IdentityProvider;
use crate::domain::repository::UserRepository;
use crate::domain::value_object::{email::Email, return_path::ReturnPath};
use crate::error::AuthResult;

/// Sign up input
pub struct SignUpInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub return_path: Option<String>,
}

/// Sign up use case
pub struct SignUpUseCase<U, P>
where
    U: UserRepository,
    P: IdentityProvider,
{
    user_repo: Arc<U>,
    provider: Arc<P>,
    config: Arc<AuthConfig>,
}

impl<U, P> SignUpUseCase<U, P>
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

    pub async fn execute(&self, input: SignUpInput) -> AuthResult<Infallible> {
        let normalizer =
            ErrorNormalizer::new(&self.config.provider_error_rules, self.config.locale);

        let signed_up = self
            .provider
            .sign_up_with_password(input.email.trim(), &input.password)
            .await
            .map_err(|e| normalizer.provider_error(e))?;

        let email = Email::new(signed_up.email.as_str())?;
        let user = self
            .user_repo
            .create(&NewUser::member(signed_up.uid.as_str(), email, &input.display_name))
            .await?;

        let return_path = ReturnPath::sanitize(input.return_path.as_deref());
        let continue_url = self.config.continue_url(&return_path);

        if let Err(e) = self
            .provider
            .send_verification_email(&signed_up.id_token, &continue_url)
            .await
        {
            tracing::warn!(user_id = %user.id, error = %e, "Verification email not sent");
        }

        tracing::info!(user_id = %user.id, "User signed up, awaiting email verification");

        Err(normalizer.email_not_verified(VerificationNotice::SignupPending))
    }
}
