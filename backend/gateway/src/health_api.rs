//! Gateway Health API

use axum::{extract::State, Json};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::server::GatewayState;

#[derive(Debug, Serialize)]
pub struct HealthReport {
    pub status: String,
    pub transport: String,
    pub uptime_seconds: u64,
    pub models: usize,
    pub panels: usize,
    pub timestamp: DateTime<Utc>,
}

/// Handler for `GET /api/health`
pub async fn get_health(State(state): State<GatewayState>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".into(),
        transport: state.hub.context().transport.name().to_string(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        models: state.models.len(),
        panels: state.hub.attached_panels(),
        timestamp: Utc::now(),
    })
}
