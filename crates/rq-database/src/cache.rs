//! Per-scope connection caching.
//!
//! [`ActiveConnectionCache`] is registered with request lifetime, so every
//! sub-container gets its own. It keeps one lease per database identifier and
//! releases all of them in [`release_all`](ActiveConnectionCache::release_all).
//! Leases are tracked by scope, not snapshotted: an acquisition that finishes
//! after `release_all` has run releases its own lease on completion.

use std::any::Any;
use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use futures_util::FutureExt;
use futures_util::future::{self, BoxFuture};
use parking_lot::Mutex;
use rq_container::{Container, ContainerExt};
use tokio::sync::OnceCell;
use tracing::{debug, error};

use crate::database::{Database, DatabaseIdentifier};
use crate::databases::Databases;
use crate::error::{DatabaseError, PoolError};
use crate::pool::{ConnectionPool, PooledConnection};

/// What `connect` hands back: resolves to a handle or the error, unchanged.
pub type ConnectionFuture<D> = BoxFuture<'static, Result<ConnectionHandle<D>, DatabaseError>>;

/// Shared handle to a leased connection. The lease itself stays with the
/// scope that acquired it.
pub struct ConnectionHandle<D: Database> {
    database: Arc<str>,
    conn: Arc<D::Connection>,
}

impl<D: Database> ConnectionHandle<D> {
    pub(crate) fn new(database: Arc<str>, conn: Arc<D::Connection>) -> Self {
        Self { database, conn }
    }

    /// Identifier of the database this connection belongs to.
    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.conn, &other.conn)
    }
}

impl<D: Database> Clone for ConnectionHandle<D> {
    fn clone(&self) -> Self {
        Self::new(self.database.clone(), self.conn.clone())
    }
}

impl<D: Database> Deref for ConnectionHandle<D> {
    type Target = D::Connection;

    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl<D: Database> std::fmt::Debug for ConnectionHandle<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionHandle")
            .field("database", &self.database)
            .finish_non_exhaustive()
    }
}

/// Type-erased lease so one cache can hold connections of any driver.
trait ErasedLease: Send + Sync {
    fn connection_any(&self) -> Arc<dyn Any + Send + Sync>;
    fn release(&self) -> Result<(), PoolError>;
}

impl<D: Database> ErasedLease for PooledConnection<D> {
    fn connection_any(&self) -> Arc<dyn Any + Send + Sync> {
        self.connection().clone()
    }

    fn release(&self) -> Result<(), PoolError> {
        PooledConnection::release(self)
    }
}

type Slot = Arc<OnceCell<Arc<dyn ErasedLease>>>;

#[derive(Default)]
struct CacheState {
    released: bool,
    slots: HashMap<String, Slot>,
}

/// Connections borrowed through one scope, keyed by database identifier.
#[derive(Default)]
pub struct ActiveConnectionCache {
    state: Mutex<CacheState>,
}

impl ActiveConnectionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the scope's connection to `database`, leasing one from `pool` on
    /// first use. Concurrent first uses of the same identifier share a
    /// single checkout.
    pub fn acquire<D: Database>(
        self: Arc<Self>,
        pool: ConnectionPool<D>,
        database: &DatabaseIdentifier<D>,
    ) -> ConnectionFuture<D> {
        let uid: Arc<str> = database.uid().into();
        let slot = {
            let mut state = self.state.lock();
            if state.released {
                return future::ready(Err(DatabaseError::ScopeReleased)).boxed();
            }
            state.slots.entry(uid.to_string()).or_default().clone()
        };

        async move {
            let lease = slot
                .get_or_try_init(|| async {
                    let pooled = pool.checkout().await?;
                    Ok::<_, PoolError>(Arc::new(pooled) as Arc<dyn ErasedLease>)
                })
                .await?
                .clone();

            // Same lock release_all takes to set `released`; any handle made
            // here is alive when release_all reaches the lease.
            let conn = {
                let state = self.state.lock();
                (!state.released).then(|| lease.connection_any())
            };
            let Some(conn) = conn else {
                debug!("Scope released during acquisition of {uid}; returning connection");
                lease.release().map_err(|source| DatabaseError::Release {
                    database: uid.to_string(),
                    source,
                })?;
                return Err(DatabaseError::ScopeReleased);
            };

            let conn = conn
                .downcast::<D::Connection>()
                .map_err(|_| DatabaseError::TypeMismatch(uid.to_string()))?;
            Ok(ConnectionHandle::new(uid, conn))
        }
        .boxed()
    }

    /// Release every lease taken through this scope and refuse new ones.
    ///
    /// Safe with zero leases. Keeps going after a failure and reports the
    /// first one. Returns the number of leases released.
    pub fn release_all(&self) -> Result<usize, DatabaseError> {
        let slots: Vec<(String, Slot)> = {
            let mut state = self.state.lock();
            state.released = true;
            state.slots.drain().collect()
        };

        let mut released = 0;
        let mut first_error = None;
        for (uid, slot) in slots {
            // Slots still connecting are handled by their own acquisition.
            let Some(lease) = slot.get() else { continue };
            match lease.release() {
                Ok(()) => released += 1,
                Err(source) => {
                    error!("Failed to release connection to {uid}: {source}");
                    first_error.get_or_insert(DatabaseError::Release {
                        database: uid,
                        source,
                    });
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => Ok(released),
        }
    }

    pub fn is_released(&self) -> bool {
        self.state.lock().released
    }

    /// Identifiers with a lease taken or in progress.
    pub fn len(&self) -> usize {
        self.state.lock().slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ActiveConnectionCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ActiveConnectionCache")
            .field("released", &state.released)
            .field("databases", &state.slots.keys().collect::<Vec<_>>())
            .finish()
    }
}

fn resolve<D, C>(
    container: &C,
    database: &DatabaseIdentifier<D>,
) -> Result<(ConnectionPool<D>, Arc<ActiveConnectionCache>), DatabaseError>
where
    D: Database,
    C: Container + ?Sized,
{
    let pool = container.make::<Databases>()?.pool(database)?;
    let cache = container.make::<ActiveConnectionCache>()?;
    Ok((pool, cache))
}

/// Get (or lease and cache) `container`'s connection to `database`.
///
/// Resolution failures come back as an already-failed future.
pub fn request_cached_connection<D, C>(
    container: &C,
    database: &DatabaseIdentifier<D>,
) -> ConnectionFuture<D>
where
    D: Database,
    C: Container + ?Sized,
{
    match resolve(container, database) {
        Ok((pool, cache)) => cache.acquire(pool, database),
        Err(e) => future::ready(Err(e)).boxed(),
    }
}

/// Release every connection cached in `container`'s scope.
pub fn release_cached_connections<C>(container: &C) -> Result<usize, DatabaseError>
where
    C: Container + ?Sized,
{
    container.make::<ActiveConnectionCache>()?.release_all()
}
