//! Request-layer configuration, registered as a service.

/// What a request does when it cannot release its connections on drop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseFailurePolicy {
    /// Log, then panic (unless the thread is already unwinding).
    #[default]
    Panic,
    /// Log only.
    Log,
}

#[derive(Debug, Clone, Default)]
pub struct RequestConfig {
    pub release_failure: ReleaseFailurePolicy,
}
