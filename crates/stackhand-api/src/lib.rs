//! # StackHand API
//!
//! HTTP control surface over the cron scheduler and the deployment runner.
//!
//! ```text
//! GET  /health                          - scheduler status, job count, uptime (no auth)
//! POST /deploy                          - {stack, tag} tag-based deployment
//! GET  /cron/jobs                       - active jobs with their next run
//! POST /cron/reload                     - rediscover jobs
//! POST /cron/jobs/{stack}/{service}/run - trigger a job now
//! ```
//!
//! Every route except `/health` requires `Authorization: Bearer <token>`.

pub mod auth;
pub mod error;
pub mod http;
pub mod server;
pub mod state;

pub use error::ApiError;
pub use http::routes::create_router;
pub use server::{ApiServer, ServerConfig};
pub use state::AppState;
