//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but request-level errors go through
//! `auth::AuthError` / `kernel::error::AppError`.

mod config;

use auth::infra::{
    AppMailer, IdentityToolkitClient, InviteTemplate, LogInviteMailer, SesInviteMailer,
};
use auth::presentation::handlers::{AuthAppState, health};
use auth::{PgAuthRepository, auth_router};
use axum::{
    Router, http,
    http::{HeaderName, Method, header},
    routing::get,
};
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{MailConfig, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,auth=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env()?;

    // Database connection
    let pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;

    tracing::info!("Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Identity provider
    let provider = IdentityToolkitClient::new(config.provider)?;

    // Invite delivery
    let mailer = build_mailer(&config.mail, &config.auth.frontend_base_url).await?;

    let state = AuthAppState::new(PgAuthRepository::new(pool), provider, mailer, config.auth);

    // CORS configuration
    let allowed_origins: Vec<http::HeaderValue> = config
        .frontend_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::DELETE,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
            HeaderName::from_static(auth::middleware::GROUP_ID_HEADER),
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", auth_router(state))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn build_mailer(mail: &MailConfig, frontend_base_url: &str) -> anyhow::Result<AppMailer> {
    let template = InviteTemplate::from_path(frontend_base_url, mail.template_path.as_deref())?;

    let mailer = match &mail.ses_from {
        Some(from) => {
            tracing::info!(region = %mail.aws_region, "Invite mail via SES");
            AppMailer::Ses(SesInviteMailer::new(&mail.aws_region, from.clone(), template).await)
        }
        None => {
            tracing::warn!("SES_FROM_EMAIL not set; invite mails are only logged");
            AppMailer::Log(LogInviteMailer::new(template))
        }
    };

    Ok(mailer)
}
