//! Axum HTTP API server for Tubely.
//!
//! This crate provides:
//! - Video ingestion: stage, remux, classify, publish, persist, sign
//! - Thumbnail upload and signed record reads
//! - HS256 bearer token authentication
//! - Security headers, request logging, and Prometheus metrics

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod state;

pub use auth::{AuthUser, JwtVerifier};
pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use services::IngestService;
pub use state::AppState;
