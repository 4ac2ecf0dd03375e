//! Service registry.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::Arc;

use crate::container::Container;
use crate::error::ServiceError;
use crate::provider::{Provider, ProviderDyn};

/// A resolved service, type-erased.
pub type AnyService = Arc<dyn Any + Send + Sync>;

pub(crate) type Factory =
    Arc<dyn Fn(&dyn Container) -> Result<AnyService, ServiceError> + Send + Sync>;

/// Key a service is registered and cached under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ServiceId {
    type_id: TypeId,
    name: &'static str,
}

impl ServiceId {
    pub fn of<S: 'static>() -> Self {
        Self {
            type_id: TypeId::of::<S>(),
            name: std::any::type_name::<S>(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// How long a factory-built service lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lifetime {
    /// Built once and shared by the root and every sub-container.
    Application,
    /// Built once per sub-container (i.e. per request).
    Request,
}

#[derive(Clone)]
pub(crate) enum Registration {
    Instance(AnyService),
    Factory { lifetime: Lifetime, build: Factory },
}

/// The set of registered services and providers.
#[derive(Clone, Default)]
pub struct Services {
    entries: HashMap<ServiceId, Registration>,
    providers: Vec<Arc<dyn ProviderDyn>>,
}

impl Services {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ready-made instance, shared by every container.
    pub fn instance<S: Send + Sync + 'static>(&mut self, service: S) {
        self.entries
            .insert(ServiceId::of::<S>(), Registration::Instance(Arc::new(service)));
    }

    /// Register a factory. The factory receives the container that asked for
    /// the service, so it can resolve its own dependencies.
    pub fn register<S, F>(&mut self, lifetime: Lifetime, factory: F)
    where
        S: Send + Sync + 'static,
        F: Fn(&dyn Container) -> Result<S, ServiceError> + Send + Sync + 'static,
    {
        let build: Factory = Arc::new(move |container| {
            factory(container).map(|service| Arc::new(service) as AnyService)
        });
        self.entries
            .insert(ServiceId::of::<S>(), Registration::Factory { lifetime, build });
    }

    /// Let a provider register its services, and keep it for boot/shutdown.
    pub fn provider<P: Provider>(&mut self, provider: P) -> Result<(), ServiceError> {
        provider.register(self)?;
        self.providers.push(Arc::new(provider));
        Ok(())
    }

    pub fn contains<S: 'static>(&self) -> bool {
        self.entries.contains_key(&ServiceId::of::<S>())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn registration(&self, id: &ServiceId) -> Option<&Registration> {
        self.entries.get(id)
    }

    pub(crate) fn providers(&self) -> &[Arc<dyn ProviderDyn>] {
        &self.providers
    }
}

impl std::fmt::Debug for Services {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.entries.keys().map(|id| id.name).collect();
        names.sort_unstable();
        f.debug_struct("Services")
            .field("services", &names)
            .field("providers", &self.providers.iter().map(|p| p.name_dyn()).collect::<Vec<_>>())
            .finish()
    }
}
