//! Cron errors.

use std::path::PathBuf;

use thiserror::Error;

use crate::job::JobId;

/// Failure while scanning stacks for cron-enabled services.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("Failed to read stacks dir {path}: {source}")]
    ReadStacksDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read {path}: {source}")]
    ReadCompose {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    ParseCompose {
        path: PathBuf,
        #[source]
        source: serde_yml::Error,
    },
}

/// A cron expression that cannot be scheduled.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("Empty schedule")]
    Empty,

    #[error("Expected 5 fields, found {0}")]
    FieldCount(usize),

    #[error("Unknown descriptor: {0}")]
    UnknownDescriptor(String),

    #[error("Invalid day-of-week: {0}")]
    DayOfWeek(String),

    #[error("Invalid @every duration: {0}")]
    Every(String),

    #[error("{0}")]
    Parse(#[from] cron::error::Error),
}

#[derive(Debug, Error)]
pub enum CronError {
    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error("Invalid cron schedule for stack={stack} service={service} schedule={schedule:?}: {source}")]
    InvalidSchedule {
        stack: String,
        service: String,
        schedule: String,
        #[source]
        source: ScheduleError,
    },

    #[error("Unknown job: {0}")]
    UnknownJob(JobId),
}
