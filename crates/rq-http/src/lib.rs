//! reqscope HTTP vocabulary
//!
//! Plain data types shared by every layer: the raw inbound message, media
//! types, the outbound response, and the error types that travel between
//! handlers and the server. No parsing of the wire format happens here; the
//! transport builds these values from whatever it received.

pub mod error;
pub mod media;
pub mod message;
pub mod response;

pub use error::{Abort, Diagnostic, SourceLocation, Status};
pub use media::{MediaType, MediaTypeError};
pub use message::{HttpMessage, Method};
pub use response::Response;
