use crate::auth::hash_password;
use crate::model::{DbConnection, ModelManager, entity::UserEntity};
use crate::utils::{signal::shutdown_signal, uploads::ensure_uploads_dir};
use crate::{error::AppResult, web::AppState};
use axum::Router;
use tokio::net::TcpListener;

pub mod config;
pub use config::{Config, ConfigError, ConfigResult};

pub mod auth;
pub mod error;
pub mod model;
pub mod services;
pub mod utils;
pub mod web;

static APPLICATION_NAME: &str = "coursehub";

pub async fn build_server() -> AppResult<(AppState, Router)> {
    let use_local = cfg!(debug_assertions);
    let config = config::Config::get_or_init(use_local).await;

    let db = DbConnection::connect(config.app().database_uri())?;
    db.migrate().await?;

    build_server_with_pool(db).await
}

/// Builds the router on an already migrated database and makes sure the
/// configured administrator exists.
pub async fn build_server_with_pool(db: DbConnection) -> AppResult<(AppState, Router)> {
    let config = config::Config::get_or_init(true).await;
    ensure_uploads_dir(config.app().uploads_dir())?;

    let mm = ModelManager::new(db);
    let admin_hash = hash_password(config.app().admin_password())?;
    UserEntity::ensure_admin(&mm, config.app().admin_username(), admin_hash).await?;

    let state = AppState::new(mm, config);
    let app = web::routes::build_app(state.clone());
    Ok((state, app))
}

#[tracing::instrument]
pub async fn setup_workers() -> AppResult<()> {
    let (state, app) = build_server().await?;
    let bindto = state.config().host().bindto();
    let listener = TcpListener::bind(bindto).await?;

    tracing::info!("axum is starting at: {}", bindto);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn setup_trace() {
    use tracing_error::ErrorLayer;
    use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

    // load .env file for RUST_LOG etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .with(ErrorLayer::default())
        .init();

    tracing::debug!("tracing initialized.");
}

#[tracing::instrument]
pub async fn run() -> AppResult<()> {
    setup_trace();
    setup_workers().await?;
    Ok(())
}
