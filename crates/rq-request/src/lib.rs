//! reqscope request
//!
//! A [`Request`] wraps one inbound [`HttpMessage`](rq_http::HttpMessage) for
//! the duration of its processing. It owns a private
//! [`SubContainer`](rq_container::SubContainer) derived from the
//! application's container, the routing [`Parameters`], and lends out
//! database connections that are released when the request is dropped.

pub mod config;
pub mod content;
pub mod parameters;
pub mod query;
pub mod request;

pub use config::{ReleaseFailurePolicy, RequestConfig};
pub use content::{ContentCoder, ContentConfig, ContentContainer, ContentError};
pub use parameters::{ParameterError, ParameterValue, Parameters};
pub use query::{QueryContainer, QueryError};
pub use request::Request;
