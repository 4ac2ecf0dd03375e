//! Bounded connection pool.
//!
//! A pool hands out at most `max_connections` leases at a time. Idle
//! connections are recycled; a lease returns its connection on
//! [`PooledConnection::release`] (or on drop). Release is synchronous so it can
//! run from a destructor.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info, warn};

use crate::database::Database;
use crate::error::PoolError;

#[derive(Debug, Clone)]
pub struct PoolConfig {
    /// Maximum number of connections leased at once.
    pub max_connections: usize,
    /// How long `checkout` waits for a free slot. `None` waits forever.
    pub acquire_timeout: Option<Duration>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            acquire_timeout: Some(Duration::from_secs(10)),
        }
    }
}

struct PoolInner<D: Database> {
    name: Arc<str>,
    database: D,
    config: PoolConfig,
    idle: Mutex<Vec<Arc<D::Connection>>>,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
    opened: AtomicUsize,
    released: AtomicUsize,
}

impl<D: Database> PoolInner<D> {
    fn pop_reusable(&self) -> Option<Arc<D::Connection>> {
        let mut idle = self.idle.lock();
        while let Some(conn) = idle.pop() {
            if self.database.is_reusable(&conn) {
                return Some(conn);
            }
            debug!("Discarding stale connection from pool {}", self.name);
        }
        None
    }
}

/// A pool of connections for one database. Cheap to clone.
pub struct ConnectionPool<D: Database> {
    inner: Arc<PoolInner<D>>,
}

impl<D: Database> Clone for ConnectionPool<D> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<D: Database> ConnectionPool<D> {
    pub fn new(name: impl Into<String>, database: D, config: PoolConfig) -> Self {
        let name: String = name.into();
        let permits = Arc::new(Semaphore::new(config.max_connections));
        Self {
            inner: Arc::new(PoolInner {
                name: name.into(),
                database,
                config,
                idle: Mutex::new(Vec::new()),
                permits,
                closed: AtomicBool::new(false),
                opened: AtomicUsize::new(0),
                released: AtomicUsize::new(0),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn database(&self) -> &D {
        &self.inner.database
    }

    pub fn config(&self) -> &PoolConfig {
        &self.inner.config
    }

    /// Lease a connection, reusing an idle one when possible.
    pub async fn checkout(&self) -> Result<PooledConnection<D>, PoolError> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        let acquire = self.inner.permits.clone().acquire_owned();
        let permit = match self.inner.config.acquire_timeout {
            Some(limit) => tokio::time::timeout(limit, acquire)
                .await
                .map_err(|_| PoolError::Timeout(limit))?,
            None => acquire.await,
        }
        .map_err(|_| PoolError::Closed)?;

        let conn = match self.inner.pop_reusable() {
            Some(conn) => conn,
            None => {
                let conn = self
                    .inner
                    .database
                    .new_connection()
                    .await
                    .map_err(PoolError::Connect)?;
                let opened = self.inner.opened.fetch_add(1, Ordering::Relaxed) + 1;
                debug!("Opened connection #{opened} for pool {}", self.inner.name);
                Arc::new(conn)
            }
        };

        Ok(PooledConnection {
            pool_name: self.inner.name.clone(),
            conn,
            lease: Mutex::new(Some(Lease {
                pool: self.inner.clone(),
                _permit: permit,
            })),
        })
    }

    /// Close the pool: pending and future checkouts fail, idle connections
    /// are dropped. Leases still out will report [`PoolError::Closed`] when
    /// released.
    pub fn close(&self) {
        if self.inner.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.inner.permits.close();
        let dropped = {
            let mut idle = self.inner.idle.lock();
            let n = idle.len();
            idle.clear();
            n
        };
        info!("Pool {} closed ({dropped} idle connections dropped)", self.inner.name);
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }

    /// Leases currently out.
    pub fn active_count(&self) -> usize {
        self.inner
            .config
            .max_connections
            .saturating_sub(self.inner.permits.available_permits())
    }

    pub fn idle_count(&self) -> usize {
        self.inner.idle.lock().len()
    }

    /// Connections opened through the driver since the pool was created.
    pub fn opened_count(&self) -> usize {
        self.inner.opened.load(Ordering::Relaxed)
    }

    /// Leases released since the pool was created.
    pub fn release_count(&self) -> usize {
        self.inner.released.load(Ordering::Relaxed)
    }
}

impl<D: Database> std::fmt::Debug for ConnectionPool<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionPool")
            .field("name", &self.inner.name)
            .field("config", &self.inner.config)
            .field("closed", &self.is_closed())
            .finish()
    }
}

struct Lease<D: Database> {
    pool: Arc<PoolInner<D>>,
    _permit: OwnedSemaphorePermit,
}

/// A leased connection. The slot is returned on [`release`](Self::release)
/// or when this value is dropped, whichever comes first.
pub struct PooledConnection<D: Database> {
    pool_name: Arc<str>,
    conn: Arc<D::Connection>,
    lease: Mutex<Option<Lease<D>>>,
}

impl<D: Database> PooledConnection<D> {
    pub fn connection(&self) -> &Arc<D::Connection> {
        &self.conn
    }

    pub fn pool_name(&self) -> &str {
        &self.pool_name
    }

    pub fn is_released(&self) -> bool {
        self.lease.lock().is_none()
    }

    /// Return the connection to its pool. Idempotent.
    ///
    /// A connection still referenced by outstanding handles is retired
    /// instead of recycled. Fails with [`PoolError::Closed`] if the pool was
    /// closed while the lease was out.
    pub fn release(&self) -> Result<(), PoolError> {
        let Some(lease) = self.lease.lock().take() else {
            return Ok(());
        };
        let pool = &lease.pool;
        pool.released.fetch_add(1, Ordering::Relaxed);

        if pool.closed.load(Ordering::SeqCst) {
            return Err(PoolError::Closed);
        }

        if Arc::strong_count(&self.conn) > 1 {
            warn!(
                "Connection to {} still referenced at release; retiring it",
                self.pool_name
            );
            return Ok(());
        }

        pool.idle.lock().push(self.conn.clone());
        debug!("Connection returned to pool {}", self.pool_name);
        Ok(())
    }
}

impl<D: Database> Drop for PooledConnection<D> {
    fn drop(&mut self) {
        if let Err(e) = self.release() {
            debug!("Dropped lease on {}: {e}", self.pool_name);
        }
    }
}
