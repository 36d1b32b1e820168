//! API routes.

use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::{get_video, health, ready, upload_thumbnail, upload_video};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, request_id, request_logging, security_headers};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    // Body limits are enforced while the multipart body streams, after the
    // handler has authorized the caller.
    let video_routes = Router::new()
        .route("/videos/:video_id", get(get_video))
        .route(
            "/videos/:video_id/upload",
            post(upload_video).layer(DefaultBodyLimit::max(state.config.max_video_upload_bytes)),
        )
        .route(
            "/videos/:video_id/thumbnail_upload",
            post(upload_thumbnail)
                .layer(DefaultBodyLimit::max(state.config.max_thumbnail_upload_bytes)),
        );

    let health_routes = Router::new()
        .route("/health", get(health))
        .route("/healthz", get(health))
        .route("/ready", get(ready));

    let metrics_routes = match metrics_handle {
        Some(handle) => Router::new().route("/metrics", get(move || async move { handle.render() })),
        None => Router::new(),
    };

    let cors = cors_layer(&state.config.cors_origins);

    Router::new()
        .merge(video_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_logging))
        .layer(middleware::from_fn(request_id))
        .layer(cors)
        .with_state(state)
}
