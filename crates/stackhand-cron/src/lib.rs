//! # StackHand Cron
//!
//! Recurring jobs declared as labels on compose services.
//!
//! A service opts in with a `stackhand.cron.schedule` label; the
//! [`CronScheduler`] discovers those services across every stack, validates
//! their schedules, and runs `docker compose run --rm <service>` for each
//! firing through a [`StackExecutor`](stackhand_protocols::StackExecutor).
//!
//! ```yaml
//! services:
//!   backup:
//!     image: restic/restic
//!     profiles: ["cron"]
//!     labels:
//!       - stackhand.cron.schedule=0 3 * * *
//!       - stackhand.cron.run_on_deploy=true
//! ```
//!
//! At most one execution per `(stack, service)` is in flight at any time;
//! overlapping firings are skipped.

pub mod discovery;
mod dispatch;
mod engine;
pub mod error;
pub mod job;
mod labels;
pub mod schedule;
mod scheduler;
mod single_flight;
mod stats;

pub use discovery::{discover, RUN_ON_DEPLOY_LABEL, SCHEDULE_LABEL};
pub use dispatch::{DispatchOutcome, JobOutcome};
pub use error::{CronError, DiscoveryError, ScheduleError};
pub use job::{JobDescriptor, JobId, ScheduledJob};
pub use schedule::CronSchedule;
pub use scheduler::{plan, CronScheduler, SchedulerOptions, SchedulerStatus};
pub use stats::StatsSnapshot;
