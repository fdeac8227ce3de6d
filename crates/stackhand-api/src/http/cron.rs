//! Cron management handlers.
//!
//! - GET  /cron/jobs                       - List active jobs
//! - POST /cron/reload                     - Rediscover jobs
//! - POST /cron/jobs/{stack}/{service}/run - Trigger a job now

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use tracing::{info, warn};

use stackhand_cron::{CronError, DispatchOutcome, JobId, ScheduledJob};

use crate::auth::RequireToken;
use crate::state::AppState;

/// One entry of the job listing.
#[derive(Debug, Serialize)]
pub struct JobView {
    pub stack: String,
    pub service: String,
    pub schedule: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile: Option<String>,
    pub run_on_deploy: bool,
    pub next_run: Option<DateTime<Utc>>,
    pub running: bool,
}

impl JobView {
    fn new(job: &ScheduledJob, running: bool) -> Self {
        let d = &job.descriptor;
        Self {
            stack: d.stack.clone(),
            service: d.service.clone(),
            schedule: d.schedule.clone(),
            profile: d.profile.clone(),
            run_on_deploy: d.run_on_deploy,
            next_run: job.next_run(),
            running,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct JobListResponse {
    pub count: usize,
    pub jobs: Vec<JobView>,
}

/// GET /cron/jobs
pub async fn list_jobs(_auth: RequireToken, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let jobs: Vec<JobView> = state
        .scheduler
        .jobs()
        .await
        .iter()
        .map(|job| JobView::new(job, state.scheduler.is_in_flight(&job.id())))
        .collect();

    Json(JobListResponse {
        count: jobs.len(),
        jobs,
    })
}

/// POST /cron/reload
pub async fn reload(_auth: RequireToken, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.scheduler.reload().await {
        Ok(count) => {
            info!(jobs = count, "Cron jobs reloaded over HTTP");
            (StatusCode::OK, Json(json!({"jobs": count})))
        }
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"error": e.to_string()})),
        ),
    }
}

/// POST /cron/jobs/{stack}/{service}/run
pub async fn run_job(
    _auth: RequireToken,
    State(state): State<Arc<AppState>>,
    Path((stack, service)): Path<(String, String)>,
) -> impl IntoResponse {
    let id = JobId::new(stack, service);
    match state.scheduler.run_now(&id).await {
        Ok(DispatchOutcome::Started) => (
            StatusCode::ACCEPTED,
            Json(json!({"status": DispatchOutcome::Started, "job": id.to_string()})),
        ),
        Ok(DispatchOutcome::Skipped) => (
            StatusCode::CONFLICT,
            Json(json!({"status": DispatchOutcome::Skipped, "job": id.to_string()})),
        ),
        Err(e @ CronError::UnknownJob(_)) => {
            (StatusCode::NOT_FOUND, Json(json!({"error": e.to_string()})))
        }
        Err(e) => {
            warn!(job = %id, error = %e, "Manual cron trigger failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": e.to_string()})),
            )
        }
    }
}
