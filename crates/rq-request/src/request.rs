//! The request root.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use futures_util::FutureExt;
use futures_util::future;
use rq_container::{
    AnyService, Container, ContainerExt, Environment, ParentContainer, ServiceError, ServiceId,
    Services, SubContainer,
};
use rq_database::{
    ConnectionFuture, Database, DatabaseConnectable, DatabaseError, DatabaseIdentifier,
    missing_default_database, release_cached_connections, request_cached_connection,
};
use rq_http::HttpMessage;
use tracing::{debug, error};
use uuid::Uuid;

use crate::config::{ReleaseFailurePolicy, RequestConfig};
use crate::content::ContentContainer;
use crate::parameters::Parameters;
use crate::query::QueryContainer;

/// One inbound message and everything scoped to its processing.
///
/// Mutating `http` (directly or through [`content`](Self::content)) needs
/// `&mut Request`; [`connect`](DatabaseConnectable::connect) only needs
/// `&Request`, so an `Arc<Request>` can be shared by concurrent sub-tasks
/// that each borrow connections.
///
/// Connections borrowed through the request are released when the last
/// owner drops it.
pub struct Request {
    /// The raw message.
    pub http: HttpMessage,
    /// Filled in by the router before the responder runs.
    pub parameters: Parameters,
    super_container: Arc<dyn Container>,
    private_container: SubContainer,
    has_active_connections: AtomicBool,
    id: Uuid,
}

impl Request {
    /// Wrap `http`, deriving this request's private scope from `container`.
    pub fn new<P: ParentContainer>(http: HttpMessage, container: Arc<P>) -> Self {
        let private_container = container.clone().sub_container();
        Self {
            http,
            parameters: Parameters::new(),
            super_container: container,
            private_container,
            has_active_connections: AtomicBool::new(false),
            id: Uuid::new_v4(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// The application-wide container this request was created from.
    pub fn super_container(&self) -> &Arc<dyn Container> {
        &self.super_container
    }

    /// This request's own scope.
    pub fn private_container(&self) -> &SubContainer {
        &self.private_container
    }

    /// Whether a connection has been requested through this request.
    pub fn has_active_connections(&self) -> bool {
        self.has_active_connections.load(Ordering::Acquire)
    }

    /// A fresh view over the query string. An absent query reads as empty.
    pub fn query(&self) -> QueryContainer<'_> {
        QueryContainer::new(self.http.query().unwrap_or(""), self)
    }

    /// A fresh view over the body. Writes through the view replace the
    /// message's body and content type together.
    pub fn content(&mut self) -> ContentContainer<'_> {
        let body = self.http.body().clone();
        let media_type = self.http.media_type();
        let http = &mut self.http;
        ContentContainer::new(&self.private_container, body, media_type, move |body, media_type| {
            http.set_body(body);
            http.set_media_type(Some(media_type));
        })
    }

    fn release_connections(&mut self) {
        let err = match release_cached_connections(&self.private_container) {
            Ok(released) => {
                debug!(request_id = %self.id, released, "Released cached connections");
                return;
            }
            // No cache service: nothing can have been leased.
            Err(DatabaseError::Service(ServiceError::NotRegistered { .. })) => return,
            Err(e) => e,
        };

        error!(
            request_id = %self.id,
            error = %err,
            "Failed to release pooled connections at request teardown"
        );
        let policy = self
            .private_container
            .make::<RequestConfig>()
            .map(|config| config.release_failure)
            .unwrap_or_default();
        if policy == ReleaseFailurePolicy::Panic && !std::thread::panicking() {
            panic!("request {} teardown: failed to release pooled connections: {err}", self.id);
        }
    }
}

impl Drop for Request {
    fn drop(&mut self) {
        if *self.has_active_connections.get_mut() {
            self.release_connections();
        }
    }
}

impl Container for Request {
    fn environment(&self) -> &Environment {
        self.private_container.environment()
    }

    fn services(&self) -> &Services {
        self.private_container.services()
    }

    fn make_any(&self, id: ServiceId) -> Result<AnyService, ServiceError> {
        self.private_container.make_any(id)
    }
}

impl DatabaseConnectable for Request {
    #[track_caller]
    fn connect<D: Database>(
        &self,
        database: Option<&DatabaseIdentifier<D>>,
    ) -> ConnectionFuture<D> {
        let Some(database) = database else {
            let diagnostic = missing_default_database();
            return future::ready(Err(DatabaseError::Configuration(diagnostic))).boxed();
        };
        // Set before the first suspension point: a request dropped while this
        // acquisition is pending must still release it.
        self.has_active_connections.store(true, Ordering::Release);
        request_cached_connection(self, database)
    }
}

impl std::fmt::Display for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.http, f)
    }
}

impl std::fmt::Debug for Request {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Debug::fmt(&self.http, f)
    }
}
