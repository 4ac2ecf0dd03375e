//! The application: root container, routes and middleware, and the
//! per-request pipeline that ties them together.

use std::sync::Arc;

use parking_lot::RwLock;
use rq_container::{Container, Environment, RootContainer, ServiceError, Services};
use rq_http::{Abort, HttpMessage, Response};
use rq_request::Request;
use tracing::{Instrument, debug, info, info_span, warn};

use crate::middleware::{Middleware, MiddlewareChain, RequestHead};
use crate::responder::HandlerResult;
use crate::router::Router;
use crate::transport::RequestHandler;

/// Application lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerState {
    Uninitialized,
    Running,
    Shutdown,
}

pub struct Application {
    container: Arc<RootContainer>,
    router: Router,
    middleware: MiddlewareChain,
    state: RwLock<ServerState>,
}

impl Application {
    pub fn new(services: Services, environment: Environment) -> Self {
        Self {
            container: RootContainer::new(services, environment),
            router: Router::new(),
            middleware: MiddlewareChain::new(),
            state: RwLock::new(ServerState::Uninitialized),
        }
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn add_middleware<M: Middleware>(&mut self, middleware: M) {
        self.middleware.add(middleware);
    }

    pub fn middleware(&self) -> &MiddlewareChain {
        &self.middleware
    }

    pub fn container(&self) -> &Arc<RootContainer> {
        &self.container
    }

    pub fn environment(&self) -> &Environment {
        self.container.environment()
    }

    pub fn state(&self) -> ServerState {
        *self.state.read()
    }

    /// Boot every registered provider. Requests are refused until this
    /// succeeds.
    pub async fn boot(&self) -> Result<(), ServiceError> {
        self.container.boot().await?;
        *self.state.write() = ServerState::Running;
        info!(
            environment = %self.environment(),
            routes = self.router.len(),
            middleware = ?self.middleware.names(),
            "Application booted"
        );
        Ok(())
    }

    /// Stop accepting requests and shut providers down in reverse order.
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write();
            if *state == ServerState::Shutdown {
                return;
            }
            *state = ServerState::Shutdown;
        }
        info!("Shutting down application");
        self.container.shutdown().await;
    }

    /// Wrap `http` in a request scoped under this application's container.
    pub fn make_request(&self, http: HttpMessage) -> Request {
        Request::new(http, self.container.clone())
    }

    /// Run the full pipeline for one message. Failures become error
    /// responses.
    pub async fn respond(&self, http: HttpMessage) -> Response {
        let request = self.make_request(http);
        let head = RequestHead::of(&request);
        let span = info_span!(
            "request",
            id = %head.id,
            method = %head.method,
            path = %head.path,
        );

        async move {
            let mut response = match self.dispatch(request).await {
                Ok(response) => response,
                Err(abort) => {
                    if abort.status >= 500 {
                        warn!(status = abort.status, "{}", abort.message);
                    } else {
                        debug!(status = abort.status, "{}", abort.message);
                    }
                    Response::from(abort)
                }
            };
            self.middleware.run_after(&head, &mut response).await;
            response
        }
        .instrument(span)
        .await
    }

    async fn dispatch(&self, mut request: Request) -> HandlerResult {
        match self.state() {
            ServerState::Shutdown => return Err(Abort::unavailable("Server is shutting down")),
            ServerState::Uninitialized => {
                return Err(Abort::unavailable("Server is not initialized"));
            }
            ServerState::Running => {}
        }

        let mw_result = self.middleware.run_before(&mut request).await;
        if !mw_result.allowed {
            return Err(mw_result
                .abort
                .unwrap_or_else(|| Abort::bad_request("Request blocked by middleware")));
        }

        let (responder, parameters) = self
            .router
            .route(&request.http.method, &request.http.path)?;
        request.parameters = parameters;

        responder.respond_dyn(request).await
    }
}

impl RequestHandler for Application {
    fn handle(&self, http: HttpMessage) -> impl std::future::Future<Output = Response> + Send {
        self.respond(http)
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("state", &self.state())
            .field("router", &self.router)
            .field("middleware", &self.middleware.names())
            .finish_non_exhaustive()
    }
}
