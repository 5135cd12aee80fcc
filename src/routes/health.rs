//! Health check endpoints
//!
//! Kubernetes-style probes:
//! - /health, /healthz - liveness (is the service running?)
//! - /ready, /readyz - readiness (can the service reach its account store?)
//!
//! Liveness returns 200 whenever the process is serving. Readiness pings
//! MongoDB when one is configured; in dev mode the in-memory store is
//! always ready.

use hyper::StatusCode;
use hyper::Response;
use serde::Serialize;
use std::sync::Arc;

use crate::routes::{json_response, BoxBody};
use crate::server::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub healthy: bool,
    pub version: &'static str,
    pub mode: String,
    pub timestamp: String,
}

#[derive(Serialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    pub store: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub fn health_check(state: &AppState) -> Response<BoxBody> {
    let mode = if state.args.dev_mode {
        "development"
    } else {
        "production"
    };

    json_response(
        StatusCode::OK,
        &HealthResponse {
            healthy: true,
            version: env!("CARGO_PKG_VERSION"),
            mode: mode.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        },
    )
}

pub async fn readiness_check(state: Arc<AppState>) -> Response<BoxBody> {
    match &state.mongo {
        Some(mongo) => match mongo.ping().await {
            Ok(()) => json_response(
                StatusCode::OK,
                &ReadinessResponse {
                    ready: true,
                    store: "mongodb",
                    error: None,
                },
            ),
            Err(e) => json_response(
                StatusCode::SERVICE_UNAVAILABLE,
                &ReadinessResponse {
                    ready: false,
                    store: "mongodb",
                    error: Some(e.to_string()),
                },
            ),
        },
        None => json_response(
            StatusCode::OK,
            &ReadinessResponse {
                ready: true,
                store: "memory",
                error: None,
            },
        ),
    }
}
