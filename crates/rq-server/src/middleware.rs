//! Middleware chain for request processing.
//!
//! Middleware can inspect/modify requests before routing and inspect
//! responses after the responder ran. They run in priority order.

use std::time::Instant;

use rq_http::{Abort, Method, Response};
use rq_request::Request;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Middleware result: whether to allow or block the request.
#[derive(Debug)]
pub struct MiddlewareResult {
    /// Whether the request should proceed
    pub allowed: bool,
    /// Error returned to the client if blocked
    pub abort: Option<Abort>,
}

impl MiddlewareResult {
    pub fn allow() -> Self {
        Self {
            allowed: true,
            abort: None,
        }
    }

    pub fn block(abort: Abort) -> Self {
        Self {
            allowed: false,
            abort: Some(abort),
        }
    }
}

/// What the after-chain still knows about a request once the responder has
/// consumed it.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub id: Uuid,
    pub method: Method,
    pub path: String,
    pub started: Instant,
}

impl RequestHead {
    pub fn of(request: &Request) -> Self {
        Self {
            id: request.id(),
            method: request.http.method.clone(),
            path: request.http.path.clone(),
            started: Instant::now(),
        }
    }
}

/// Trait for request middleware.
pub trait Middleware: Send + Sync + 'static {
    /// Inspect or modify a request before it is routed.
    fn before(
        &self,
        request: &mut Request,
    ) -> impl std::future::Future<Output = MiddlewareResult> + Send;

    /// Inspect or modify a response (optional). Runs for error responses too.
    fn after(
        &self,
        _head: &RequestHead,
        _response: &mut Response,
    ) -> impl std::future::Future<Output = ()> + Send {
        async {}
    }

    /// Middleware name for debugging.
    fn name(&self) -> &str;

    /// Priority (lower runs first).
    fn priority(&self) -> i32 {
        0
    }
}

/// A chain of middleware executed in priority order.
pub struct MiddlewareChain {
    middlewares: Vec<Box<dyn MiddlewareDyn>>,
}

/// Object-safe version of Middleware trait; all refs share lifetime `'a`.
trait MiddlewareDyn: Send + Sync {
    fn before_dyn<'a>(
        &'a self,
        request: &'a mut Request,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = MiddlewareResult> + Send + 'a>>;

    fn after_dyn<'a>(
        &'a self,
        head: &'a RequestHead,
        response: &'a mut Response,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>>;

    fn name_dyn(&self) -> &str;
    fn priority_dyn(&self) -> i32;
}

impl<T: Middleware> MiddlewareDyn for T {
    fn before_dyn<'a>(
        &'a self,
        request: &'a mut Request,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = MiddlewareResult> + Send + 'a>> {
        Box::pin(self.before(request))
    }

    fn after_dyn<'a>(
        &'a self,
        head: &'a RequestHead,
        response: &'a mut Response,
    ) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + Send + 'a>> {
        Box::pin(self.after(head, response))
    }

    fn name_dyn(&self) -> &str {
        self.name()
    }

    fn priority_dyn(&self) -> i32 {
        self.priority()
    }
}

impl MiddlewareChain {
    pub fn new() -> Self {
        Self {
            middlewares: Vec::new(),
        }
    }

    pub fn add<M: Middleware>(&mut self, middleware: M) {
        self.middlewares.push(Box::new(middleware));
        self.middlewares.sort_by_key(|m| m.priority_dyn());
    }

    /// Run the before-chain, stopping at the first block.
    pub async fn run_before(&self, request: &mut Request) -> MiddlewareResult {
        for mw in &self.middlewares {
            let result = mw.before_dyn(request).await;
            if !result.allowed {
                warn!(
                    request_id = %request.id(),
                    "Request blocked by middleware {}",
                    mw.name_dyn()
                );
                return result;
            }
        }
        MiddlewareResult::allow()
    }

    /// Run the after-chain.
    pub async fn run_after(&self, head: &RequestHead, response: &mut Response) {
        for mw in &self.middlewares {
            mw.after_dyn(head, response).await;
        }
    }

    pub fn names(&self) -> Vec<&str> {
        self.middlewares.iter().map(|m| m.name_dyn()).collect()
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

/// Logs every request and the status it finished with.
#[derive(Debug, Default)]
pub struct RequestLogging;

impl Middleware for RequestLogging {
    async fn before(&self, request: &mut Request) -> MiddlewareResult {
        debug!(request_id = %request.id(), "→ {} {}", request.http.method, request.http.target());
        MiddlewareResult::allow()
    }

    async fn after(&self, head: &RequestHead, response: &mut Response) {
        info!(
            status = response.status,
            elapsed_ms = head.started.elapsed().as_millis() as u64,
            "{} {}",
            head.method.as_str(),
            head.path,
        );
    }

    fn name(&self) -> &str {
        "request-logging"
    }

    fn priority(&self) -> i32 {
        -100
    }
}
