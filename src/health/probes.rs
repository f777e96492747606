//! Probe handlers.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{extract::State, http::StatusCode, routing::get, Router};

use crate::config::HealthConfig;

pub const LIVENESS_PATH: &str = "/healthz/live";
pub const READINESS_PATH: &str = "/healthz/ready";

/// Readiness gate that opens a fixed delay after startup.
#[derive(Debug, Clone)]
pub struct Readiness {
    started: Instant,
    delay: Duration,
}

impl Readiness {
    pub fn new(delay: Duration) -> Self {
        Self {
            started: Instant::now(),
            delay,
        }
    }

    pub fn from_config(config: &HealthConfig) -> Self {
        Self::new(Duration::from_secs(config.readiness_delay_secs))
    }

    pub fn is_ready(&self) -> bool {
        self.started.elapsed() >= self.delay
    }
}

/// Router serving both probe endpoints.
pub fn probe_routes(readiness: Readiness) -> Router {
    Router::new()
        .route(LIVENESS_PATH, get(live))
        .route(READINESS_PATH, get(ready))
        .with_state(Arc::new(readiness))
}

async fn live() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

async fn ready(State(readiness): State<Arc<Readiness>>) -> (StatusCode, &'static str) {
    if readiness.is_ready() {
        (StatusCode::OK, "OK")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "Service Unavailable")
    }
}
