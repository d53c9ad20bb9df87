// src/common/test_support.rs
//! In-memory stores for service tests

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::common::config::SyncConfig;
use crate::common::migrations::{run_local_migrations, run_remote_migrations};
use crate::common::AppState;
use crate::db::{QueryExecutor, Stores};
use crate::services::rate_limit::RateLimitConfig;
use crate::services::{GoogleService, RateLimitService, RecommendationService, UserService};

/// A single-connection in-memory pool. One connection keeps every query on
/// the same database, and disabling reaping keeps it alive for the test.
pub async fn memory_pool() -> SqlitePool {
    SqlitePoolOptions::new()
        .min_connections(1)
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap()
}

pub async fn local_pool() -> SqlitePool {
    let pool = memory_pool().await;
    run_local_migrations(&pool, false).await.unwrap();
    pool
}

pub async fn remote_pool() -> SqlitePool {
    let pool = memory_pool().await;
    run_remote_migrations(&pool).await.unwrap();
    pool
}

/// Executor over a migrated local store and, optionally, a migrated remote one
pub async fn test_executor(with_remote: bool) -> QueryExecutor {
    let remote = if with_remote {
        Some(remote_pool().await)
    } else {
        None
    };
    QueryExecutor::new(Stores::from_pools(local_pool().await, remote))
}

/// Shared application state over in-memory stores with Google sign-in disabled
pub async fn test_state(with_remote: bool) -> Arc<RwLock<AppState>> {
    let executor = test_executor(with_remote).await;

    Arc::new(RwLock::new(AppState {
        stores: executor.stores().clone(),
        jwt_secret: "test_secret_key".to_string(),
        access_token_ttl_minutes: 60,
        onboarding_password: "open sesame".to_string(),
        user_service: Arc::new(UserService::new(executor.clone())),
        recommendation_service: Arc::new(RecommendationService::new(
            executor.clone(),
            SyncConfig::default(),
        )),
        rate_limit_service: Arc::new(RateLimitService::new(
            executor,
            RateLimitConfig::default(),
        )),
        google_service: Arc::new(GoogleService::new(reqwest::Client::new(), None)),
    }))
}
