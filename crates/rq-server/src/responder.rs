//! Route handlers.

use std::future::Future;
use std::pin::Pin;

use rq_http::{Abort, Response};
use rq_request::Request;

/// Result of a responder.
pub type HandlerResult = Result<Response, Abort>;

/// Trait implemented by route handlers. The responder owns the request; the
/// request's connections are released once it (and any clones of an
/// `Arc<Request>` made from it) is dropped.
pub trait Responder: Send + Sync + 'static {
    fn respond(&self, request: Request) -> impl Future<Output = HandlerResult> + Send;
}

impl<F, Fut> Responder for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send,
{
    fn respond(&self, request: Request) -> impl Future<Output = HandlerResult> + Send {
        self(request)
    }
}

/// Object-safe wrapper for the Responder trait.
pub(crate) trait ResponderDyn: Send + Sync {
    fn respond_dyn(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = HandlerResult> + Send + '_>>;
}

impl<T: Responder> ResponderDyn for T {
    fn respond_dyn(
        &self,
        request: Request,
    ) -> Pin<Box<dyn Future<Output = HandlerResult> + Send + '_>> {
        Box::pin(self.respond(request))
    }
}
