//! Scopes that hand out connections, and the manual pooled-connection API.

use std::future::Future;
use std::sync::Arc;

use rq_container::{Container, ContainerExt};
use rq_http::Diagnostic;
use tracing::warn;

use crate::cache::{ConnectionFuture, ConnectionHandle};
use crate::database::{Database, DatabaseIdentifier, Model};
use crate::databases::Databases;
use crate::error::DatabaseError;

/// Implemented by scopes that can lend database connections.
pub trait DatabaseConnectable: Container {
    /// Connect to `database`. `None` means no identifier was configured;
    /// implementations must fail fast with [`missing_default_database`].
    fn connect<D: Database>(&self, database: Option<&DatabaseIdentifier<D>>) -> ConnectionFuture<D>;

    /// Connect to `M`'s default database.
    fn connect_for<M: Model>(&self) -> ConnectionFuture<M::Database> {
        self.connect(M::default_database().as_ref())
    }
}

/// The error for connecting without an identifier.
#[track_caller]
pub fn missing_default_database() -> Diagnostic {
    Diagnostic::new(
        "defaultDB",
        "no default backing-store configured for this resolution context",
    )
    .with_possible_causes([
        "The model's default_database() returned None.",
        "connect(None) was called directly.",
    ])
    .with_suggested_fixes([
        "Configure a default database identifier on the model by implementing Model::default_database().",
        "Pass an explicit DatabaseIdentifier to connect(Some(&id)) instead of relying on a default.",
        "Use with_pooled_connection(container, &id, |conn| ...) to manage the connection scope manually instead of using the request as the scope.",
    ])
}

/// Lease a connection for the duration of `body`, then release it.
///
/// Unlike [`DatabaseConnectable::connect`] the connection is not cached in
/// any scope: every call leases its own.
pub async fn with_pooled_connection<C, D, F, Fut, T, E>(
    container: &C,
    database: &DatabaseIdentifier<D>,
    body: F,
) -> Result<T, E>
where
    C: Container + ?Sized,
    D: Database,
    F: FnOnce(ConnectionHandle<D>) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: From<DatabaseError>,
{
    let pool = container
        .make::<Databases>()
        .map_err(DatabaseError::from)?
        .pool(database)?;
    let pooled = pool.checkout().await.map_err(DatabaseError::from)?;

    let handle = ConnectionHandle::new(Arc::from(database.uid()), pooled.connection().clone());
    let result = body(handle).await;

    if let Err(e) = pooled.release() {
        warn!("Failed to release pooled connection to {database}: {e}");
    }
    result
}
