//! HTTP middleware for the device auth service.
//!
//! - `request_id` - Correlation id propagation (`X-Request-Id`)
//! - `http_metrics` - Request/response metrics for every route

pub mod http_metrics;
pub mod request_id;

pub use http_metrics::http_metrics_middleware;
pub use request_id::{request_id_middleware, RequestId};
