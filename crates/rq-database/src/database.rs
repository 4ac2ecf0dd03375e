//! Drivers, identifiers and models.

use std::future::Future;
use std::marker::PhantomData;

use rq_container::BoxError;

/// A database driver: knows how to open a new connection.
pub trait Database: Send + Sync + 'static {
    type Connection: Send + Sync + 'static;

    /// Open a fresh connection.
    fn new_connection(&self) -> impl Future<Output = Result<Self::Connection, BoxError>> + Send;

    /// Whether an idle connection may be handed out again.
    fn is_reusable(&self, _connection: &Self::Connection) -> bool {
        true
    }
}

/// Names a registered database of driver type `D`.
pub struct DatabaseIdentifier<D> {
    uid: String,
    _driver: PhantomData<fn() -> D>,
}

impl<D> DatabaseIdentifier<D> {
    pub fn new(uid: impl Into<String>) -> Self {
        Self {
            uid: uid.into(),
            _driver: PhantomData,
        }
    }

    pub fn uid(&self) -> &str {
        &self.uid
    }
}

impl<D> Clone for DatabaseIdentifier<D> {
    fn clone(&self) -> Self {
        Self::new(self.uid.clone())
    }
}

impl<D> PartialEq for DatabaseIdentifier<D> {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid
    }
}

impl<D> Eq for DatabaseIdentifier<D> {}

impl<D> std::fmt::Debug for DatabaseIdentifier<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "DatabaseIdentifier({:?})", self.uid)
    }
}

impl<D> std::fmt::Display for DatabaseIdentifier<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.uid)
    }
}

/// A type stored in a database. `default_database` is what
/// [`DatabaseConnectable::connect_for`](crate::DatabaseConnectable::connect_for)
/// connects to; `None` means the model has not been configured.
pub trait Model: Send + Sync + 'static {
    type Database: Database;

    fn default_database() -> Option<DatabaseIdentifier<Self::Database>> {
        None
    }
}
