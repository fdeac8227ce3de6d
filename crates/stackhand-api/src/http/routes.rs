//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::http::{cron, deploy, monitoring};
use crate::state::AppState;

/// Create the router.
///
/// ## Route Structure
///
/// ```text
/// /health                              - Health check (no auth)
/// /deploy                              - POST deploy {stack, tag}
/// /cron
///   GET  /cron/jobs                    - List active jobs
///   POST /cron/reload                  - Rediscover jobs
///   POST /cron/jobs/{stack}/{service}/run - Trigger a job now
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    let cron_routes = Router::new()
        .route("/jobs", get(cron::list_jobs))
        .route("/reload", post(cron::reload))
        .route("/jobs/{stack}/{service}/run", post(cron::run_job));

    Router::new()
        .route("/health", get(monitoring::health))
        .route("/deploy", post(deploy::deploy))
        .nest("/cron", cron_routes)
        .with_state(state)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
