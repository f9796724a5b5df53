//! HTTP request handlers.
//!
//! Handlers validate the request (path, body, headers) before touching any
//! store, call into the services layer, and attach the request id to every
//! error they return.

pub mod devices;
pub mod health;
pub mod metrics;
pub mod tokens;

pub use devices::{get_device, update_device_status};
pub use health::{health_check, readiness_check};
pub use metrics::metrics_handler;
pub use tokens::{delete_token, revoke_device_tokens, verify_token};
