use thiserror::Error;

/// Boxed error used at trait-object seams (factories, provider hooks).
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("no service registered for {service}")]
    NotRegistered { service: &'static str },

    /// A request-lifetime service was asked for outside any request scope.
    #[error("{service} is request-scoped and cannot be resolved from the root container")]
    ScopeRequired { service: &'static str },

    #[error("service {service} resolved to an unexpected type")]
    TypeMismatch { service: &'static str },

    #[error("failed to build {service}: {source}")]
    Build {
        service: &'static str,
        #[source]
        source: BoxError,
    },

    #[error("provider {provider} failed to boot: {source}")]
    Boot {
        provider: String,
        #[source]
        source: BoxError,
    },
}

impl ServiceError {
    pub fn build(service: &'static str, source: impl Into<BoxError>) -> Self {
        Self::Build {
            service,
            source: source.into(),
        }
    }
}
