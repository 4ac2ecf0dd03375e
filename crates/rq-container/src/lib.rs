//! reqscope service container
//!
//! Services are registered once in a [`Services`] registry and resolved by
//! type through anything implementing [`Container`]. The application owns a
//! [`RootContainer`]; every request derives a [`SubContainer`] from it.
//! Registrations with [`Lifetime::Request`] are built and cached per
//! sub-container, everything else falls back to the parent.

pub mod container;
pub mod environment;
pub mod error;
pub mod provider;
pub mod services;

pub use container::{Container, ContainerExt, ParentContainer, RootContainer, SubContainer};
pub use environment::Environment;
pub use error::{BoxError, ServiceError};
pub use provider::Provider;
pub use services::{AnyService, Lifetime, ServiceId, Services};
