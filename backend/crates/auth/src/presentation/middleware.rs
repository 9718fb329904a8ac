//! Auth Middleware
//!
//! Guards for protected routes. Each guard resolves the caller and stores
//! the result in request extensions for the handlers behind it:
//! [`CurrentUser`] always, [`GroupContext`] for group-scoped routes.

use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use kernel::id::GroupId;
use platform::client::extract_bearer_token;
use platform::cookie::extract_cookie;

use crate::application::{AuthenticateUseCase, require_admin};
use crate::domain::entity::{group::GroupMembership, user::User};
use crate::error::{AuthError, AuthResult};
use crate::presentation::handlers::{AuthAppState, AuthStore, MailerPort, ProviderPort};

/// Header carrying the target group of group-scoped routes
pub const GROUP_ID_HEADER: &str = "x-group-id";

/// Authenticated caller
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

/// Caller's membership in the group named by [`GROUP_ID_HEADER`]
#[derive(Debug, Clone)]
pub struct GroupContext(pub GroupMembership);

/// Bearer token first, then the session cookie
fn credential(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    extract_bearer_token(headers).or_else(|| extract_cookie(headers, cookie_name))
}

async fn authenticate<R, P, M>(
    state: &AuthAppState<R, P, M>,
    headers: &HeaderMap,
) -> AuthResult<User>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let token = credential(headers, &state.config.session_cookie_name);
    AuthenticateUseCase::new(state.repo.clone(), state.provider.clone(), state.config.clone())
        .execute(token.as_deref())
        .await
}

/// Require an authenticated user
pub async fn require_auth<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let user = authenticate(&state, req.headers()).await?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Require an authenticated application admin
pub async fn require_admin_user<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let user = authenticate(&state, req.headers()).await?;
    require_admin(&user)?;
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}

/// Require membership in the group named by `X-Group-ID`
pub async fn require_group_membership<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let user = authenticate(&state, req.headers()).await?;

    let group_id = req
        .headers()
        .get(GROUP_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<GroupId>().ok())
        .filter(|id| id.as_i64() > 0)
        .ok_or(AuthError::InvalidGroupId)?;

    let membership =
        AuthenticateUseCase::new(state.repo.clone(), state.provider.clone(), state.config.clone())
            .require_membership(&user, group_id)
            .await?;

    req.extensions_mut().insert(GroupContext(membership));
    req.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(req).await)
}
