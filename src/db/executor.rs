// src/db/executor.rs
//! Single-statement executor over [`Stores`]
//!
//! Every dynamic value travels as a bound [`SqlParam`]; statement text is
//! always a fixed string owned by the caller.

use sqlx::query::{Query, QueryAs};
use sqlx::sqlite::{SqliteArguments, SqliteRow};
use sqlx::{Connection, FromRow, Sqlite};
use tracing::{error, warn};

use super::{DbError, StoreTarget, Stores};

/// A positional parameter bound to a `?` placeholder
#[derive(Debug, Clone, PartialEq)]
pub enum SqlParam {
    Null,
    Int(i64),
    Float(f64),
    Text(String),
    Bool(bool),
}

impl From<i64> for SqlParam {
    fn from(v: i64) -> Self {
        SqlParam::Int(v)
    }
}

impl From<f64> for SqlParam {
    fn from(v: f64) -> Self {
        SqlParam::Float(v)
    }
}

impl From<bool> for SqlParam {
    fn from(v: bool) -> Self {
        SqlParam::Bool(v)
    }
}

impl From<String> for SqlParam {
    fn from(v: String) -> Self {
        SqlParam::Text(v)
    }
}

impl From<&str> for SqlParam {
    fn from(v: &str) -> Self {
        SqlParam::Text(v.to_string())
    }
}

impl From<&String> for SqlParam {
    fn from(v: &String) -> Self {
        SqlParam::Text(v.clone())
    }
}

impl<T: Into<SqlParam>> From<Option<T>> for SqlParam {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlParam::Null)
    }
}

/// Build a `Vec<SqlParam>` from heterogeneous values
#[macro_export]
macro_rules! params {
    () => { Vec::<$crate::db::SqlParam>::new() };
    ($($value:expr),+ $(,)?) => {
        vec![$($crate::db::SqlParam::from($value)),+]
    };
}

fn bind_query<'q>(
    mut query: Query<'q, Sqlite, SqliteArguments<'q>>,
    params: &'q [SqlParam],
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
            SqlParam::Bool(v) => query.bind(*v),
        };
    }
    query
}

fn bind_query_as<'q, T>(
    mut query: QueryAs<'q, Sqlite, T, SqliteArguments<'q>>,
    params: &'q [SqlParam],
) -> QueryAs<'q, Sqlite, T, SqliteArguments<'q>> {
    for param in params {
        query = match param {
            SqlParam::Null => query.bind(None::<String>),
            SqlParam::Int(v) => query.bind(*v),
            SqlParam::Float(v) => query.bind(*v),
            SqlParam::Text(v) => query.bind(v.as_str()),
            SqlParam::Bool(v) => query.bind(*v),
        };
    }
    query
}

#[derive(Debug, Clone)]
pub struct QueryExecutor {
    stores: Stores,
}

impl QueryExecutor {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Run a row-returning statement and collect every row
    pub async fn fetch_all<T>(
        &self,
        target: StoreTarget,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        let mut conn = self.stores.acquire(target).await?;
        let mut tx = conn.begin().await?;

        let result = bind_query_as(sqlx::query_as::<_, T>(sql), params)
            .fetch_all(&mut *tx)
            .await;

        match result {
            Ok(rows) => {
                tx.commit().await?;
                Ok(rows)
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, store = %target, "Rollback failed");
                }
                error!(error = %e, store = %target, "Query failed");
                Err(DbError::OperationFailed(e))
            }
        }
    }

    pub async fn fetch_optional<T>(
        &self,
        target: StoreTarget,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<Option<T>, DbError>
    where
        T: for<'r> FromRow<'r, SqliteRow> + Send + Unpin,
    {
        Ok(self.fetch_all(target, sql, params).await?.into_iter().next())
    }

    /// Run a statement without fetching, returning the affected row count
    pub async fn execute(
        &self,
        target: StoreTarget,
        sql: &str,
        params: &[SqlParam],
    ) -> Result<u64, DbError> {
        let mut conn = self.stores.acquire(target).await?;
        let mut tx = conn.begin().await?;

        let result = bind_query(sqlx::query(sql), params).execute(&mut *tx).await;

        match result {
            Ok(done) => {
                tx.commit().await?;
                Ok(done.rows_affected())
            }
            Err(e) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, store = %target, "Rollback failed");
                }
                error!(error = %e, store = %target, "Statement failed");
                Err(DbError::OperationFailed(e))
            }
        }
    }
}

/// `?, ?, ...` with `count` placeholders for an `IN (...)` list
pub fn placeholders(count: usize) -> String {
    vec!["?"; count].join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::test_support::memory_pool;

    async fn executor_with_table() -> QueryExecutor {
        let pool = memory_pool().await;
        sqlx::query("CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, body TEXT NOT NULL)")
            .execute(&pool)
            .await
            .unwrap();
        QueryExecutor::new(Stores::from_pools(pool, None))
    }

    #[tokio::test]
    async fn test_statement_breaking_input_is_literal_data() {
        let executor = executor_with_table().await;
        let hostile = "x'); DROP TABLE notes; --";

        executor
            .execute(
                StoreTarget::Local,
                "INSERT INTO notes (body) VALUES (?)",
                &crate::params![hostile],
            )
            .await
            .unwrap();

        let rows: Vec<(i64, String)> = executor
            .fetch_all(
                StoreTarget::Local,
                "SELECT id, body FROM notes WHERE body = ?",
                &crate::params![hostile],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].1, hostile);
    }

    #[tokio::test]
    async fn test_failed_statement_rolls_back_and_releases() {
        let executor = executor_with_table().await;

        let err = executor
            .execute(
                StoreTarget::Local,
                "INSERT INTO notes (body) VALUES (?)",
                &[SqlParam::Null],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::OperationFailed(_)));

        // Pool has one connection; this only works if the failed call released it
        let count: Option<(i64,)> = executor
            .fetch_optional(StoreTarget::Local, "SELECT COUNT(*) FROM notes", &[])
            .await
            .unwrap();
        assert_eq!(count, Some((0,)));
    }

    #[tokio::test]
    async fn test_remote_target_without_pool_is_unavailable() {
        let executor = executor_with_table().await;

        let err = executor
            .execute(StoreTarget::Remote, "SELECT 1", &[])
            .await
            .unwrap_err();
        assert!(err.is_unavailable());
    }

    #[test]
    fn test_placeholders() {
        assert_eq!(placeholders(1), "?");
        assert_eq!(placeholders(3), "?, ?, ?");
    }

    #[test]
    fn test_option_params_become_null() {
        let none: Option<String> = None;
        assert_eq!(SqlParam::from(none), SqlParam::Null);
        assert_eq!(SqlParam::from(Some(5i64)), SqlParam::Int(5));
    }
}
