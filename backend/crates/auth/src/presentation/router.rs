//! Auth Router

use axum::handler::Handler;
use axum::middleware::from_fn_with_state;
use axum::{
    Router,
    routing::{get, post},
};

use crate::presentation::handlers::{self, AuthAppState, AuthStore, MailerPort, ProviderPort};
use crate::presentation::middleware::{require_admin_user, require_auth, require_group_membership};

/// Create the Auth router (mount under `/api`)
pub fn auth_router<R, P, M>(state: AuthAppState<R, P, M>) -> Router
where
    R: AuthStore,
    P: ProviderPort,
    M: MailerPort,
{
    let authed = Router::new()
        .route("/me", get(handlers::me))
        .route("/invites/{token}/accept", post(handlers::accept_invite::<R, P, M>))
        .route("/invites/{token}/decline", post(handlers::decline_invite::<R, P, M>))
        .route_layer(from_fn_with_state(state.clone(), require_auth::<R, P, M>));

    let managed = Router::new()
        .route(
            "/invites",
            post(handlers::create_invite::<R, P, M>).get(handlers::list_invites::<R, P, M>),
        )
        .route_layer(from_fn_with_state(
            state.clone(),
            require_group_membership::<R, P, M>,
        ));

    let admin = Router::new()
        .route("/admin/users/me", get(handlers::admin_me))
        .route_layer(from_fn_with_state(state.clone(), require_admin_user::<R, P, M>));

    // GET is public, DELETE is group-scoped; same path so one method router
    let delete_invite = handlers::delete_invite::<R, P, M>.layer(from_fn_with_state(
        state.clone(),
        require_group_membership::<R, P, M>,
    ));

    Router::new()
        .route("/login", post(handlers::login::<R, P, M>))
        .route("/signup", post(handlers::signup::<R, P, M>))
        .route("/refresh", post(handlers::refresh::<R, P, M>))
        .route("/logout", post(handlers::logout::<R, P, M>))
        .route(
            "/invites/{token}",
            get(handlers::verify_invite::<R, P, M>).delete(delete_invite),
        )
        .merge(authed)
        .merge(managed)
        .merge(admin)
        .with_state(state)
}
