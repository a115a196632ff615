//! Request handler module
//!
//! The wrapper that turns application handlers into transport handlers, and
//! the built-in handlers every server can register.

pub mod builtin;
pub mod wrapper;

pub use builtin::{echo_id, health, health_status, method_not_allowed, not_found, unauthorized};
pub use wrapper::{client_address, strip_port, Pipeline, RequestLog, Wrapper};
