//! HTTP layer module
//!
//! Request/response types shared by handlers, the router and the server:
//! the [`Envelope`] every handler returns, the [`Request`] it receives, and
//! builders for transport responses.

pub mod envelope;
pub mod request;
pub mod response;

// Re-export commonly used types
pub use envelope::Envelope;
pub use request::{Params, Request};
pub use response::{apply_json_headers, build_redirect_response, build_response};
