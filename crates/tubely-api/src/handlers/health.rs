//! Health check handlers.

use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use tracing::warn;

use crate::state::AppState;

/// Health response.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: String,
}

/// Liveness probe.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub status: String,
    pub checks: ReadinessChecks,
}

#[derive(Serialize)]
pub struct ReadinessChecks {
    pub storage: CheckStatus,
    pub firestore: CheckStatus,
    pub media_tools: CheckStatus,
}

#[derive(Serialize)]
pub struct CheckStatus {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
}

impl CheckStatus {
    fn ok(started: Instant) -> Self {
        Self {
            status: "ok".to_string(),
            error: None,
            latency_ms: Some(started.elapsed().as_millis() as u64),
        }
    }

    fn error(msg: impl Into<String>) -> Self {
        Self {
            status: "error".to_string(),
            error: Some(msg.into()),
            latency_ms: None,
        }
    }

    fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

/// Readiness probe. Checks the bucket, the record store, and the media tools.
///
/// Failure details stay in the log; the body only names the failing check.
pub async fn ready(
    State(state): State<AppState>,
) -> Result<Json<ReadinessResponse>, (StatusCode, Json<ReadinessResponse>)> {
    let storage = {
        let start = Instant::now();
        match state.publisher.check_connectivity().await {
            Ok(()) => CheckStatus::ok(start),
            Err(e) => {
                warn!("Storage readiness check failed: {}", e);
                CheckStatus::error("storage unreachable")
            }
        }
    };

    let firestore = {
        let start = Instant::now();
        match state.store.check_connectivity().await {
            Ok(()) => CheckStatus::ok(start),
            Err(e) => {
                warn!("Firestore readiness check failed: {}", e);
                CheckStatus::error("firestore unreachable")
            }
        }
    };

    let media_tools = {
        let start = Instant::now();
        if state.media.is_available() {
            CheckStatus::ok(start)
        } else {
            CheckStatus::error("ffmpeg or ffprobe not found")
        }
    };

    let all_ok = storage.is_ok() && firestore.is_ok() && media_tools.is_ok();

    let response = ReadinessResponse {
        status: if all_ok { "ready" } else { "degraded" }.to_string(),
        checks: ReadinessChecks {
            storage,
            firestore,
            media_tools,
        },
    };

    if all_ok {
        Ok(Json(response))
    } else {
        Err((StatusCode::SERVICE_UNAVAILABLE, Json(response)))
    }
}
