//! Health check handler.

use std::sync::Arc;

use axum::{extract::State, Json};
use serde::Serialize;

use stackhand_cron::{SchedulerStatus, StatsSnapshot};

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// The scheduler is running.
    Healthy,
    /// The HTTP surface is up but the scheduler is stopped.
    Degraded,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    pub scheduler: SchedulerStatus,
    pub jobs: usize,
    pub uptime_seconds: u64,
    pub cron: StatsSnapshot,
}

/// GET /health
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let scheduler = state.scheduler.status().await;
    let status = match scheduler {
        SchedulerStatus::Running => HealthStatus::Healthy,
        SchedulerStatus::Stopped => HealthStatus::Degraded,
    };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        scheduler,
        jobs: state.scheduler.timer_count().await,
        uptime_seconds: state.uptime().as_secs(),
        cron: state.scheduler.stats(),
    })
}
