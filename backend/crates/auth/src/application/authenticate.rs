//! Authenticate Use Case
//!
//! Turns the credential carried by a request (bearer ID token or session
//! cookie) into a local [`User`], applying the application idle timeout on
//! top of the provider's own token lifetime.

use std::sync::Arc;

use chrono::Utc;
use kernel::id::GroupId;

use crate::application::config::AuthConfig;
use crate::application::error_normalizer::ErrorNormalizer;
use crate::domain::entity::group::GroupMembership;
use crate::domain::entity::user::{NewUser, Staleness, User};
use crate::domain::identity::{IdentityProvider, VerifiedAssertion};
use crate::domain::repository::{MembershipRepository, UserRepository};
use crate::domain::value_object::email::Email;
use crate::error::{AuthError, AuthResult};

/// Authenticate use case
pub struct AuthenticateUseCase<R, P>
where
    R: UserRepository + MembershipRepository,
    P: IdentityProvider,
{
    repo: Arc<R>,
    provider: Arc<P>,
    config: Arc<AuthConfig>,
}

impl<R, P> AuthenticateUseCase<R, P>
where
    R: UserRepository + MembershipRepository,
    P: IdentityProvider,
{
    pub fn new(repo: Arc<R>, provider: Arc<P>, config: Arc<AuthConfig>) -> Self {
        Self {
            repo,
            provider,
            config,
        }
    }

    /// Resolve the caller
    ///
    /// `credential` is the bearer token if present, else the session
    /// cookie value.
    pub async fn execute(&self, credential: Option<&str>) -> AuthResult<User> {
        let credential = credential
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .ok_or(AuthError::Unauthenticated)?;

        let assertion = self
            .provider
            .verify_assertion(credential)
            .await
            .map_err(|e| {
                let normalizer =
                    ErrorNormalizer::new(&self.config.provider_error_rules, self.config.locale);
                match normalizer.provider_error(e) {
                    // Transport problems stay visible as such
                    err @ (AuthError::ProviderUnavailable(_)
                    | AuthError::ProviderMisconfigured(_)) => err,
                    _ => AuthError::InvalidSession,
                }
            })?;

        let user = self.resolve_user(&assertion).await?;

        let now = Utc::now();
        match user.staleness(
            now,
            self.config.idle_timeout_delta(),
            self.config.access_touch_interval_delta(),
        ) {
            Staleness::Expired => {
                tracing::info!(user_id = %user.id, "Session rejected after idle timeout");
                Err(AuthError::SessionExpired)
            }
            Staleness::NeedsTouch => {
                if let Err(e) = self.repo.touch_last_access(user.id, now).await {
                    tracing::warn!(user_id = %user.id, error = %e, "Failed to update last access");
                    return Ok(user);
                }
                Ok(User {
                    last_access_at: Some(now),
                    ..user
                })
            }
            Staleness::Fresh => Ok(user),
        }
    }

    async fn resolve_user(&self, assertion: &VerifiedAssertion) -> AuthResult<User> {
        if let Some(user) = self.repo.find_by_provider_uid(&assertion.uid).await? {
            return Ok(user);
        }

        // Artifact minted before the local row existed
        let Some(email) = assertion.email.as_deref() else {
            return Err(AuthError::Unauthenticated);
        };
        if let Some(user) = self.repo.find_by_email(email).await? {
            return Ok(user);
        }

        if !(self.config.provision_on_first_sight && assertion.email_verified) {
            return Err(AuthError::Unauthenticated);
        }

        let email = Email::new(email).map_err(|_| AuthError::Unauthenticated)?;
        match self
            .repo
            .create(&NewUser::member(assertion.uid.as_str(), email, ""))
            .await
        {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "Local user provisioned on first request");
                Ok(user)
            }
            Err(AuthError::EmailExists | AuthError::IdentityConflict) => self
                .repo
                .find_by_provider_uid(&assertion.uid)
                .await?
                .ok_or(AuthError::Unauthenticated),
            Err(e) => Err(e),
        }
    }

    /// Membership of `user` in `group_id`, or `Forbidden`
    pub async fn require_membership(
        &self,
        user: &User,
        group_id: GroupId,
    ) -> AuthResult<GroupMembership> {
        self.repo
            .find_membership(group_id, user.id)
            .await?
            .ok_or(AuthError::Forbidden)
    }
}

/// Application-wide admin check
pub fn require_admin(user: &User) -> AuthResult<()> {
    if user.is_admin() {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}

/// Group-level manager check
pub fn require_manager(membership: &GroupMembership) -> AuthResult<()> {
    if membership.is_manager() {
        Ok(())
    } else {
        Err(AuthError::Forbidden)
    }
}
