//! HTTP Handlers

use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::{StatusCode, header};
use axum::response::IntoResponse;
use kernel::id::InviteId;
use platform::cookie::set_cookie_header;
use std::sync::Arc;

use crate::application::config::AuthConfig;
use crate::application::{
    CreateInviteInput, CreateInviteUseCase, ManageInvitesUseCase, RefreshSessionUseCase,
    RespondInviteUseCase, SignInInput, SignInUseCase, SignUpInput, SignUpUseCase,
    VerifyInviteUseCase,
};
use crate::domain::identity::IdentityProvider;
use crate::domain::mailer::InviteMailer;
use crate::domain::repository::{
    GroupRepository, InviteRepository, MembershipRepository, UserRepository,
};
use crate::error::{AuthError, AuthResult};
use crate::presentation::dto::{
    AuthResponse, CreateInviteRequest, CreateInviteResponse, InviteListItem, LoginRequest,
    MembershipResponse, RefreshRequest, RefreshResponse, SignupRequest, StatusResponse,
    UserResponse, VerifyInviteResponse,
};
use crate::presentation::middleware::{CurrentUser, GroupContext};

/// Everything the store must provide
pub trait AuthStore:
    UserRepository + GroupRepository + MembershipRepository + InviteRepository + Send + Sync + 'static
{
}

impl<T> AuthStore for T where
    T: UserRepository
        + GroupRepository
        + MembershipRepository
        + InviteRepository
        + Send
        + Sync
        + 'static
{
}

pub trait ProviderPort: IdentityProvider + Send + Sync + 'static {}
impl<T> ProviderPort for T where T: IdentityProvider + Send + Sync + 'static {}

pub trait MailerPort: InviteMailer + Send + Sync + 'static {}
impl<T> MailerPort for T where T: InviteMailer + Send + Sync + 'static {}

/// Shared state for auth handlers
pub struct AuthAppState<R, P, M> {
    pub repo: Arc<R>,
    pub provider: Arc<P>,
    pub mailer: Arc<M>,
    pub config: Arc<AuthConfig>,
}

impl<R, P, M> Clone for AuthAppState<R, P, M> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            provider: self.provider.clone(),
            mailer: self.mailer.clone(),
            config: self.config.clone(),
        }
    }
}

impl<R, P, M> AuthAppState<R, P, M> {
    pub fn new(repo: R, provider: P, mailer: M, config: AuthConfig) -> Self {
        Self {
            repo: Arc::new(repo),
            provider: Arc::new(provider),
            mailer: Arc::new(mailer),
            config: Arc::new(config),
        }
    }
}

// ============================================================================
// Session
// ============================================================================

/// POST /api/login
pub async fn login<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Json(req): Json<LoginRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let use_case = SignInUseCase::new(state.repo.clone(), state.provider.clone(), state.config.clone());

    let output = use_case
        .execute(SignInInput {
            email: req.email,
            password: req.password,
            return_path: req.back_path,
        })
        .await?;

    let cookie = state.config.session_cookie().build_set_cookie(output.session.as_str());
    let user = UserResponse::from(&output.user);

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, set_cookie_header(&cookie))],
        Json(AuthResponse {
            id: user.id,
            email: user.email,
            display_name: user.display_name,
            role: user.role,
            token: output.session.as_str().to_string(),
            refresh_token: output.refresh_token,
            id_token: state.config.expose_id_token.then_some(output.id_token),
        }),
    ))
}

/// POST /api/signup
///
/// Always ends in an error response; `EMAIL_NOT_VERIFIED` means the account
/// was created and the verification mail is on its way.
pub async fn signup<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Json(req): Json<SignupRequest>,
) -> AuthError
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let use_case = SignUpUseCase::new(state.repo.clone(), state.provider.clone(), state.config.clone());

    let Err(err) = use_case
        .execute(SignUpInput {
            email: req.email,
            password: req.password,
            display_name: req.display_name,
            return_path: req.back_path,
        })
        .await;

    err
}

/// POST /api/refresh
pub async fn refresh<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Json(req): Json<RefreshRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let use_case = RefreshSessionUseCase::new(state.provider.clone(), state.config.clone());
    let output = use_case.execute(&req.refresh_token).await?;

    let cookie = state.config.session_cookie().build_set_cookie(output.session.as_str());

    Ok((
        StatusCode::OK,
        [(header::SET_COOKIE, set_cookie_header(&cookie))],
        Json(RefreshResponse {
            token: output.session.as_str().to_string(),
            refresh_token: output.refresh_token,
            id_token: state.config.expose_id_token.then_some(output.id_token),
        }),
    ))
}

/// POST /api/logout
///
/// The provider cookie cannot be revoked from here; clearing it client-side
/// is all logout does.
pub async fn logout<R, P, M>(State(state): State<AuthAppState<R, P, M>>) -> impl IntoResponse
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let cookie = state.config.session_cookie().build_delete_cookie();
    (StatusCode::NO_CONTENT, [(header::SET_COOKIE, set_cookie_header(&cookie))])
}

/// GET /api/me
pub async fn me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}

/// GET /health
pub async fn health() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

// ============================================================================
// Invites
// ============================================================================

/// GET /api/invites/{token}
pub async fn verify_invite<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Path(token): Path<String>,
) -> AuthResult<Json<VerifyInviteResponse>>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let view = VerifyInviteUseCase::new(state.repo.clone()).view(&token).await?;
    Ok(Json(VerifyInviteResponse::from(view)))
}

/// POST /api/invites/{token}/accept
pub async fn accept_invite<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> AuthResult<Json<MembershipResponse>>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let membership = RespondInviteUseCase::new(state.repo.clone())
        .accept(&token, &user)
        .await?;
    Ok(Json(MembershipResponse::from(membership)))
}

/// POST /api/invites/{token}/decline
pub async fn decline_invite<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Extension(CurrentUser(user)): Extension<CurrentUser>,
    Path(token): Path<String>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    RespondInviteUseCase::new(state.repo.clone())
        .decline(&token, &user)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/invites (X-Group-ID)
pub async fn create_invite<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Extension(GroupContext(membership)): Extension<GroupContext>,
    Json(req): Json<CreateInviteRequest>,
) -> AuthResult<impl IntoResponse>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let use_case =
        CreateInviteUseCase::new(state.repo.clone(), state.mailer.clone(), state.config.clone());

    let invite = use_case
        .execute(CreateInviteInput {
            email: req.email,
            role: req.role,
            invited_by: membership.user_id,
            group_id: membership.group_id,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(CreateInviteResponse::from(&invite))))
}

/// GET /api/invites (X-Group-ID)
pub async fn list_invites<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Extension(GroupContext(membership)): Extension<GroupContext>,
) -> AuthResult<Json<Vec<InviteListItem>>>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let invites = ManageInvitesUseCase::new(state.repo.clone())
        .list(&membership)
        .await?;
    Ok(Json(invites.into_iter().map(InviteListItem::from).collect()))
}

/// DELETE /api/invites/{id} (X-Group-ID)
pub async fn delete_invite<R, P, M>(
    State(state): State<AuthAppState<R, P, M>>,
    Extension(GroupContext(membership)): Extension<GroupContext>,
    Path(id): Path<String>,
) -> AuthResult<StatusCode>
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let id: InviteId = id.parse().map_err(|_| AuthError::NotFound("Invite"))?;

    ManageInvitesUseCase::new(state.repo.clone())
        .delete(&membership, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Admin
// ============================================================================

/// GET /api/admin/users/me
pub async fn admin_me(Extension(CurrentUser(user)): Extension<CurrentUser>) -> Json<UserResponse> {
    Json(UserResponse::from(&user))
}
