//! Providers bundle service registrations with boot and shutdown hooks.

use std::future::Future;
use std::pin::Pin;

use crate::container::Container;
use crate::error::{BoxError, ServiceError};
use crate::services::Services;

/// Trait implemented by anything that contributes services to an application.
///
/// `register` runs while the [`Services`] registry is being assembled.
/// `boot` runs once after the root container exists, `shutdown` once when
/// the application stops.
pub trait Provider: Send + Sync + 'static {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Add this provider's services to the registry.
    fn register(&self, services: &mut Services) -> Result<(), ServiceError>;

    fn boot(
        &self,
        _container: &dyn Container,
    ) -> impl Future<Output = Result<(), BoxError>> + Send {
        async { Ok(()) }
    }

    fn shutdown(&self, _container: &dyn Container) -> impl Future<Output = ()> + Send {
        async {}
    }
}

/// Object-safe version of [`Provider`]; all refs share lifetime `'a`.
pub(crate) trait ProviderDyn: Send + Sync {
    fn name_dyn(&self) -> &str;

    fn boot_dyn<'a>(
        &'a self,
        container: &'a dyn Container,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>>;

    fn shutdown_dyn<'a>(
        &'a self,
        container: &'a dyn Container,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>>;
}

impl<T: Provider> ProviderDyn for T {
    fn name_dyn(&self) -> &str {
        self.name()
    }

    fn boot_dyn<'a>(
        &'a self,
        container: &'a dyn Container,
    ) -> Pin<Box<dyn Future<Output = Result<(), BoxError>> + Send + 'a>> {
        Box::pin(self.boot(container))
    }

    fn shutdown_dyn<'a>(
        &'a self,
        container: &'a dyn Container,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
        Box::pin(self.shutdown(container))
    }
}
