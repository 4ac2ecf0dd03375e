//! reqscope server: turns inbound messages into requests and responses.
//!
//! The [`Application`] owns the root container, the router and the
//! middleware chain, and implements [`RequestHandler`] for the transport.

pub mod application;
pub mod config;
pub mod middleware;
pub mod responder;
pub mod router;
pub mod transport;

pub use application::{Application, ServerState};
pub use config::ServerConfig;
pub use middleware::{Middleware, MiddlewareChain, MiddlewareResult, RequestHead, RequestLogging};
pub use responder::{HandlerResult, Responder};
pub use router::{RouteError, Router, Segment};
pub use transport::{RequestHandler, TransportError, TransportServer};
