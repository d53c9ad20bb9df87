// src/main.rs
use axum::{extract::Extension, middleware, Router};
use dotenv::dotenv;
use reqwest::Client;
use std::path::PathBuf;
use std::{net::SocketAddr, sync::Arc};
use tokio::{net::TcpListener, sync::RwLock};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod common;
mod db;
mod health;
mod logging_middleware;
mod profile;
mod rate_limit_middleware;
mod recommendations;
mod services;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use common::config::AppConfig;
use common::AppState;
use db::{QueryExecutor, Stores};
use services::{GoogleService, RateLimitService, RecommendationService, UserService};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env();

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    ensure_sqlite_parent_dir(&config.local_db.url).await?;
    if config.remote_bootstrap_schema {
        if let Some(remote) = &config.remote_db {
            ensure_sqlite_parent_dir(&remote.url).await?;
        }
    }

    let stores = Stores::connect(
        &config.local_db,
        config.remote_db.as_ref(),
        config.remote_bootstrap_schema,
    )
    .await?;

    common::migrations::run_local_migrations(stores.local(), config.reset_db).await?;

    if config.remote_bootstrap_schema {
        if let Ok(remote) = stores.pool(db::StoreTarget::Remote) {
            if let Err(e) = common::migrations::run_remote_migrations(remote).await {
                tracing::warn!(error = %e, "Remote schema bootstrap failed");
            }
        }
    }

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let executor = QueryExecutor::new(stores.clone());
    let http_client = Client::builder().build()?;

    let user_service = Arc::new(UserService::new(executor.clone()));
    info!("UserService initialized");

    let recommendation_service = Arc::new(RecommendationService::new(
        executor.clone(),
        config.sync.clone(),
    ));

    let rate_limit_service = Arc::new(RateLimitService::new(
        executor,
        config.rate_limit.clone(),
    ));
    rate_limit_service
        .clone()
        .start_purge_task(config.rate_limit_purge_interval);
    info!("Rate limit purge task started");

    let google_service = Arc::new(GoogleService::new(
        http_client,
        config.google_client_id.clone(),
    ));

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let app_state = AppState {
        stores: stores.clone(),
        jwt_secret: config.jwt_secret.clone(),
        access_token_ttl_minutes: config.access_token_ttl_minutes,
        onboarding_password: config.onboarding_password.clone(),
        user_service,
        recommendation_service,
        rate_limit_service,
        google_service,
    };

    let shared = Arc::new(RwLock::new(app_state));

    // ========================================================================
    // ROUTER COMPOSITION
    // ========================================================================

    let origins: Vec<axum::http::HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    let app = Router::new()
        .merge(health::health_routes())
        .merge(auth::auth_routes())
        .merge(profile::profile_routes())
        .merge(recommendations::recommendation_routes())
        // Add request/response body logging in debug mode
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(Extension(shared.clone()))
        .layer(
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods([
                    axum::http::Method::GET,
                    axum::http::Method::POST,
                    axum::http::Method::PUT,
                    axum::http::Method::DELETE,
                    axum::http::Method::OPTIONS,
                ])
                .allow_headers([
                    axum::http::header::CONTENT_TYPE,
                    axum::http::header::AUTHORIZATION,
                ])
                .allow_credentials(true),
        )
        .layer(TraceLayer::new_for_http());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    stores.close().await;
    info!("Shutdown complete");

    Ok(())
}

/// Create the parent directory of a file-backed SQLite URL
async fn ensure_sqlite_parent_dir(database_url: &str) -> anyhow::Result<()> {
    if let Some(path_part) = database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
