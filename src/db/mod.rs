//! Dual-store database access.
//!
//! - [`pools::Stores`] owns the local and (optional) remote connection pools.
//!   The local pool is mandatory; a remote pool that fails to connect is
//!   recorded as unavailable and every remote acquisition then fails with
//!   [`DbError::StoreUnavailable`].
//! - [`executor::QueryExecutor`] runs exactly one bound statement per call
//!   inside its own transaction: commit on success, rollback otherwise.

pub mod executor;
pub mod pools;

use std::fmt;
use thiserror::Error;

pub use executor::{QueryExecutor, SqlParam};
pub use pools::Stores;

/// Which backing store a statement targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreTarget {
    Local,
    Remote,
}

impl fmt::Display for StoreTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreTarget::Local => write!(f, "local"),
            StoreTarget::Remote => write!(f, "remote"),
        }
    }
}

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{0} store unavailable")]
    StoreUnavailable(StoreTarget),

    #[error("database operation failed: {0}")]
    OperationFailed(#[from] sqlx::Error),
}

impl DbError {
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DbError::StoreUnavailable(_))
    }

    pub fn is_unique_violation(&self) -> bool {
        match self {
            DbError::OperationFailed(sqlx::Error::Database(db_err)) => db_err.is_unique_violation(),
            _ => false,
        }
    }
}
