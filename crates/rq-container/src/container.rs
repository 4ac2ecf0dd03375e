//! Containers: the resolution scopes services are made from.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, info};

use crate::environment::Environment;
use crate::error::ServiceError;
use crate::services::{AnyService, Lifetime, Registration, ServiceId, Services};

/// A scope services can be resolved from.
///
/// This is the only capability pool, codec and request code depend on: they
/// take `&dyn Container` (or `C: Container + ?Sized`) and never care whether
/// they were handed the root, a sub-container or a request.
pub trait Container: Send + Sync {
    fn environment(&self) -> &Environment;

    /// Registry backing this scope.
    fn services(&self) -> &Services;

    /// Resolve a service by id. Use [`ContainerExt::make`] for the typed form.
    fn make_any(&self, id: ServiceId) -> Result<AnyService, ServiceError>;
}

/// Typed resolution on top of [`Container::make_any`].
pub trait ContainerExt: Container {
    fn make<S: Send + Sync + 'static>(&self) -> Result<Arc<S>, ServiceError> {
        let id = ServiceId::of::<S>();
        self.make_any(id)?
            .downcast::<S>()
            .map_err(|_| ServiceError::TypeMismatch { service: id.name() })
    }
}

impl<C: Container + ?Sized> ContainerExt for C {}

/// A container that child scopes can be derived from.
pub trait ParentContainer: Container + Sized + 'static {
    /// Derive a child scope whose parent is `self`.
    fn sub_container(self: Arc<Self>) -> SubContainer {
        SubContainer::new(self)
    }
}

/// Per-container cache of factory-built services.
#[derive(Default)]
struct ServiceCache {
    entries: DashMap<ServiceId, AnyService>,
}

impl ServiceCache {
    fn get_or_build(
        &self,
        id: ServiceId,
        build: impl FnOnce() -> Result<AnyService, ServiceError>,
    ) -> Result<AnyService, ServiceError> {
        if let Some(hit) = self.entries.get(&id) {
            return Ok(hit.value().clone());
        }
        // Build outside the shard lock: factories resolve their own dependencies.
        let built = build()?;
        Ok(self.entries.entry(id).or_insert(built).value().clone())
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Root container
// ─────────────────────────────────────────────────────────────────────────────

/// The application-wide container.
pub struct RootContainer {
    environment: Environment,
    services: Services,
    cache: ServiceCache,
}

impl RootContainer {
    pub fn new(services: Services, environment: Environment) -> Arc<Self> {
        Arc::new(Self {
            environment,
            services,
            cache: ServiceCache::default(),
        })
    }

    /// Run every provider's boot hook, in registration order.
    pub async fn boot(&self) -> Result<(), ServiceError> {
        for provider in self.services.providers() {
            debug!("Booting provider: {}", provider.name_dyn());
            provider
                .boot_dyn(self)
                .await
                .map_err(|source| ServiceError::Boot {
                    provider: provider.name_dyn().to_string(),
                    source,
                })?;
        }
        info!(
            "Container booted ({} services, {} providers, env: {})",
            self.services.len(),
            self.services.providers().len(),
            self.environment
        );
        Ok(())
    }

    /// Run every provider's shutdown hook, in reverse registration order.
    pub async fn shutdown(&self) {
        for provider in self.services.providers().iter().rev() {
            debug!("Shutting down provider: {}", provider.name_dyn());
            provider.shutdown_dyn(self).await;
        }
    }
}

impl Container for RootContainer {
    fn environment(&self) -> &Environment {
        &self.environment
    }

    fn services(&self) -> &Services {
        &self.services
    }

    fn make_any(&self, id: ServiceId) -> Result<AnyService, ServiceError> {
        match self.services.registration(&id) {
            None => Err(ServiceError::NotRegistered { service: id.name() }),
            Some(Registration::Instance(service)) => Ok(service.clone()),
            Some(Registration::Factory {
                lifetime: Lifetime::Request,
                ..
            }) => Err(ServiceError::ScopeRequired { service: id.name() }),
            Some(Registration::Factory { build, .. }) => {
                self.cache.get_or_build(id, || build(self))
            }
        }
    }
}

impl ParentContainer for RootContainer {}

impl std::fmt::Debug for RootContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RootContainer")
            .field("environment", &self.environment)
            .field("services", &self.services)
            .field("cached", &self.cache.len())
            .finish()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Sub-container
// ─────────────────────────────────────────────────────────────────────────────

/// A child scope. Request-lifetime services are built and cached here;
/// everything else is resolved by the parent.
pub struct SubContainer {
    parent: Arc<dyn Container>,
    cache: ServiceCache,
}

impl SubContainer {
    pub fn new(parent: Arc<dyn Container>) -> Self {
        Self {
            parent,
            cache: ServiceCache::default(),
        }
    }

    pub fn parent(&self) -> &Arc<dyn Container> {
        &self.parent
    }

    /// Number of request-lifetime services built in this scope so far.
    pub fn cached_len(&self) -> usize {
        self.cache.len()
    }
}

impl Container for SubContainer {
    fn environment(&self) -> &Environment {
        self.parent.environment()
    }

    fn services(&self) -> &Services {
        self.parent.services()
    }

    fn make_any(&self, id: ServiceId) -> Result<AnyService, ServiceError> {
        match self.parent.services().registration(&id) {
            None => Err(ServiceError::NotRegistered { service: id.name() }),
            Some(Registration::Factory {
                lifetime: Lifetime::Request,
                build,
            }) => self.cache.get_or_build(id, || build(self)),
            Some(_) => self.parent.make_any(id),
        }
    }
}

impl std::fmt::Debug for SubContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SubContainer")
            .field("environment", self.parent.environment())
            .field("cached", &self.cache.len())
            .finish()
    }
}
