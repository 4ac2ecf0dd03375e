use std::time::Duration;

use rq_container::{BoxError, ServiceError};
use rq_http::{Abort, Diagnostic, Status};
use thiserror::Error;

/// Failures inside a [`ConnectionPool`](crate::ConnectionPool).
#[derive(Debug, Error)]
pub enum PoolError {
    #[error("connection pool is closed")]
    Closed,

    #[error("timed out after {0:?} waiting for a pooled connection")]
    Timeout(Duration),

    #[error("failed to open connection: {0}")]
    Connect(#[source] BoxError),
}

#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Nothing to connect to: no identifier was supplied or configured.
    #[error(transparent)]
    Configuration(#[from] Diagnostic),

    #[error("service resolution failed: {0}")]
    Service(#[from] ServiceError),

    #[error("no database registered for identifier {0:?}")]
    UnknownDatabase(String),

    #[error("database {0:?} is registered with a different driver type")]
    TypeMismatch(String),

    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error("failed to release connection to {database:?}: {source}")]
    Release {
        database: String,
        #[source]
        source: PoolError,
    },

    #[error("the owning scope was released before the connection was established")]
    ScopeReleased,
}

impl DatabaseError {
    pub fn diagnostic(&self) -> Option<&Diagnostic> {
        match self {
            Self::Configuration(d) => Some(d),
            _ => None,
        }
    }
}

impl From<DatabaseError> for Abort {
    fn from(err: DatabaseError) -> Self {
        match err {
            DatabaseError::Configuration(diagnostic) => Abort::from(diagnostic),
            DatabaseError::Pool(PoolError::Timeout(_)) | DatabaseError::Pool(PoolError::Closed) => {
                Abort::new(Status::ServiceUnavailable, err.to_string())
            }
            other => Abort::internal(other.to_string()),
        }
    }
}
