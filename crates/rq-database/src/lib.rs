//! reqscope database layer
//!
//! - [`Database`] drivers open connections.
//! - [`ConnectionPool`] bounds and recycles them.
//! - [`Databases`] maps [`DatabaseIdentifier`]s to pools for an application.
//! - [`ActiveConnectionCache`] is a request-lifetime service that remembers
//!   every connection borrowed through one scope, so the scope's owner can
//!   release them all at once.
//! - [`DatabaseConnectable`] is implemented by scopes that hand out
//!   connections (the request).

pub mod cache;
pub mod connectable;
pub mod database;
pub mod databases;
pub mod error;
pub mod memory;
pub mod pool;
pub mod postgres;

pub use cache::{
    ActiveConnectionCache, ConnectionFuture, ConnectionHandle, release_cached_connections,
    request_cached_connection,
};
pub use connectable::{DatabaseConnectable, missing_default_database, with_pooled_connection};
pub use database::{Database, DatabaseIdentifier, Model};
pub use databases::{Databases, DatabasesProvider};
pub use error::{DatabaseError, PoolError};
pub use memory::{MemoryConnection, MemoryDatabase};
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use postgres::{PostgresConfig, PostgresDatabase};
