//! Device Authentication Service Library
//!
//! Decides whether a device may access protected resources. Devices carry
//! self-contained signed tokens; operators admit or reject devices; every
//! verification re-checks the token record and the device's admission
//! status against the stores.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/*.rs -> repositories/*.rs
//! ```
//!
//! # Modules
//!
//! - `config` - Service configuration from environment
//! - `crypto` - Token codec (EdDSA JWT encode/decode)
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Request id and HTTP metrics middleware
//! - `models` - Data models
//! - `observability` - Metrics and log-safe correlation hashing
//! - `repositories` - Device registry and token store (PostgreSQL, in-memory)
//! - `routes` - Axum router and application state
//! - `services` - Verification engine, admission controller, token lifecycle
//! - `tasks` - Background maintenance tasks

pub mod config;
pub mod crypto;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod tasks;
