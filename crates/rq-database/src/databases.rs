//! Registry of configured databases and the provider that installs it.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

use rq_container::{BoxError, Container, Lifetime, Provider, ServiceError, Services};
use tracing::info;

use crate::cache::ActiveConnectionCache;
use crate::database::{Database, DatabaseIdentifier};
use crate::error::DatabaseError;
use crate::pool::{ConnectionPool, PoolConfig};

/// Object-safe view of a `ConnectionPool<D>` for the registry.
trait ErasedPool: Send + Sync {
    fn as_any(&self) -> &dyn Any;
    fn close(&self);
    fn active_count(&self) -> usize;
}

impl<D: Database> ErasedPool for ConnectionPool<D> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn close(&self) {
        ConnectionPool::close(self)
    }

    fn active_count(&self) -> usize {
        ConnectionPool::active_count(self)
    }
}

/// Pools keyed by identifier. Clones share the same pools.
#[derive(Clone, Default)]
pub struct Databases {
    pools: HashMap<String, Arc<dyn ErasedPool>>,
}

impl Databases {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `database` under `id` and return its pool.
    /// Re-registering an identifier replaces the previous pool.
    pub fn add<D: Database>(
        &mut self,
        id: &DatabaseIdentifier<D>,
        database: D,
        config: PoolConfig,
    ) -> ConnectionPool<D> {
        let pool = ConnectionPool::new(id.uid(), database, config);
        self.pools
            .insert(id.uid().to_string(), Arc::new(pool.clone()));
        pool
    }

    pub fn pool<D: Database>(
        &self,
        id: &DatabaseIdentifier<D>,
    ) -> Result<ConnectionPool<D>, DatabaseError> {
        let erased = self
            .pools
            .get(id.uid())
            .ok_or_else(|| DatabaseError::UnknownDatabase(id.uid().to_string()))?;
        erased
            .as_any()
            .downcast_ref::<ConnectionPool<D>>()
            .cloned()
            .ok_or_else(|| DatabaseError::TypeMismatch(id.uid().to_string()))
    }

    pub fn contains(&self, uid: &str) -> bool {
        self.pools.contains_key(uid)
    }

    pub fn identifiers(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.pools.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// Leases currently out across all pools.
    pub fn active_count(&self) -> usize {
        self.pools.values().map(|p| p.active_count()).sum()
    }

    pub fn close_all(&self) {
        for pool in self.pools.values() {
            pool.close();
        }
    }
}

impl std::fmt::Debug for Databases {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Databases")
            .field("identifiers", &self.identifiers())
            .finish()
    }
}

/// Installs [`Databases`] (application lifetime) and
/// [`ActiveConnectionCache`] (request lifetime); closes the pools on shutdown.
pub struct DatabasesProvider {
    databases: Databases,
}

impl DatabasesProvider {
    pub fn new(databases: Databases) -> Self {
        Self { databases }
    }
}

impl Provider for DatabasesProvider {
    fn name(&self) -> &str {
        "databases"
    }

    fn register(&self, services: &mut Services) -> Result<(), ServiceError> {
        services.instance(self.databases.clone());
        services.register(Lifetime::Request, |_| Ok(ActiveConnectionCache::new()));
        Ok(())
    }

    async fn boot(&self, _container: &dyn Container) -> Result<(), BoxError> {
        info!("Databases ready: {:?}", self.databases.identifiers());
        Ok(())
    }

    async fn shutdown(&self, _container: &dyn Container) {
        self.databases.close_all();
    }
}
