// src/db/pools.rs
//! Connection pool manager for the local and remote stores

use sqlx::pool::PoolConnection;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Sqlite;
use std::str::FromStr;
use std::time::Duration;
use tracing::{error, info, warn};

use super::{DbError, StoreTarget};
use crate::common::config::StoreConfig;

/// Both store pools, constructed once at startup and shared by cloning.
///
/// Dropping a connection obtained from [`Stores::acquire`] returns it to the
/// pool it came from, on every exit path.
#[derive(Debug, Clone)]
pub struct Stores {
    local: SqlitePool,
    remote: Option<SqlitePool>,
}

impl Stores {
    pub fn from_pools(local: SqlitePool, remote: Option<SqlitePool>) -> Self {
        Self { local, remote }
    }

    /// Connect both pools. A local failure is returned to the caller and
    /// must abort startup; a remote failure only disables the remote store.
    pub async fn connect(
        local: &StoreConfig,
        remote: Option<&StoreConfig>,
        create_remote_if_missing: bool,
    ) -> Result<Self, DbError> {
        let local_pool = connect_pool(local, true).await.map_err(|e| {
            error!(error = %e, "Error initializing local connection pool");
            DbError::OperationFailed(e)
        })?;
        info!(
            min_connections = local.min_connections,
            max_connections = local.max_connections,
            "Local database connection pool initialized"
        );

        let remote_pool = match remote {
            Some(cfg) => match connect_pool(cfg, create_remote_if_missing).await {
                Ok(pool) => {
                    info!(
                        min_connections = cfg.min_connections,
                        max_connections = cfg.max_connections,
                        "Remote database connection pool initialized"
                    );
                    Some(pool)
                }
                Err(e) => {
                    warn!(error = %e, "Remote database connection failed, continuing without it");
                    None
                }
            },
            None => {
                info!("No remote database configured, remote sync disabled");
                None
            }
        };

        Ok(Self::from_pools(local_pool, remote_pool))
    }

    pub fn remote_available(&self) -> bool {
        self.remote.is_some()
    }

    pub fn local(&self) -> &SqlitePool {
        &self.local
    }

    pub fn pool(&self, target: StoreTarget) -> Result<&SqlitePool, DbError> {
        match target {
            StoreTarget::Local => Ok(&self.local),
            StoreTarget::Remote => self
                .remote
                .as_ref()
                .ok_or(DbError::StoreUnavailable(StoreTarget::Remote)),
        }
    }

    /// Check out a connection bound to `target`
    pub async fn acquire(&self, target: StoreTarget) -> Result<PoolConnection<Sqlite>, DbError> {
        let pool = self.pool(target)?;
        pool.acquire().await.map_err(|e| {
            error!(error = %e, store = %target, "Failed to acquire database connection");
            DbError::OperationFailed(e)
        })
    }

    pub async fn close(&self) {
        self.local.close().await;
        info!("Local connection pool closed");

        if let Some(remote) = &self.remote {
            remote.close().await;
            info!("Remote connection pool closed");
        }
    }
}

async fn connect_pool(cfg: &StoreConfig, create_if_missing: bool) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(&cfg.url)?
        .create_if_missing(create_if_missing)
        .foreign_keys(true)
        .busy_timeout(Duration::from_secs(5));

    SqlitePoolOptions::new()
        .min_connections(cfg.min_connections)
        .max_connections(cfg.max_connections)
        .acquire_timeout(cfg.acquire_timeout)
        .connect_with(options)
        .await
}
