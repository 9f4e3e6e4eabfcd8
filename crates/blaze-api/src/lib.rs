//! Axum HTTP API server.
//!
//! This crate provides:
//! - Per-chat video/thumbnail pairing endpoints
//! - Size-bounded JPEG thumbnail transcoding of uploaded cover images
//! - Security headers, request IDs and structured request logs
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::ExpiryListener;
pub use state::AppState;
