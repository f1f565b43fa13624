use std::sync::Arc;

use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use curabot_store::ReferenceStore;
use serde::Serialize;
use tracing::warn;

pub const LIVENESS_TEXT: &str = "CuraBot is running! 🤖";

const STORE_CHECK_KEY: &str = "health-check";

#[derive(Clone)]
pub struct HealthState {
    store: Arc<dyn ReferenceStore>,
}

impl HealthState {
    pub fn new(store: Arc<dyn ReferenceStore>) -> Self {
        Self { store }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub store: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/", get(liveness)).route("/health", get(health)).with_state(state)
}

pub async fn liveness() -> &'static str {
    LIVENESS_TEXT
}

/// Ready only when the reference store answers a read.
pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let backend = state.store.backend_name();
    let store = match state.store.get(STORE_CHECK_KEY).await {
        Ok(_) => HealthCheck { status: "ready", detail: format!("{backend} reference store answered a read") },
        Err(error) => {
            warn!(
                event_name = "system.health.store_unavailable",
                correlation_id = "health",
                backend,
                error = %error,
                "reference store check failed"
            );
            HealthCheck { status: "degraded", detail: format!("{backend} reference store unavailable: {error}") }
        }
    };

    let ready = store.status == "ready";
    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "curabot-server accepting interactions".to_string(),
        },
        store,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(payload))
}
