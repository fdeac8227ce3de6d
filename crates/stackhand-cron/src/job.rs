//! Job descriptors.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::schedule::CronSchedule;

/// Identity of a cron job: the service within its stack.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct JobId {
    pub stack: String,
    pub service: String,
}

impl JobId {
    pub fn new(stack: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            stack: stack.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.stack, self.service)
    }
}

/// A cron-enabled service as discovered from a compose file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JobDescriptor {
    pub stack: String,
    pub service: String,
    /// Raw schedule text from the label, trimmed.
    pub schedule: String,
    /// Set only when the service declares exactly one profile.
    pub profile: Option<String>,
    pub run_on_deploy: bool,
    pub compose_file: PathBuf,
}

impl JobDescriptor {
    pub fn id(&self) -> JobId {
        JobId::new(&self.stack, &self.service)
    }

    /// `docker compose --file <f> [--profile p] run --rm <service>`.
    pub fn compose_command(&self, docker: &str) -> Vec<String> {
        let mut args = vec![
            docker.to_string(),
            "compose".to_string(),
            "--file".to_string(),
            self.compose_file.display().to_string(),
        ];
        if let Some(profile) = &self.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
        args.extend(["run".to_string(), "--rm".to_string(), self.service.clone()]);
        args
    }
}

/// A descriptor paired with its parsed schedule.
#[derive(Debug, Clone)]
pub struct ScheduledJob {
    pub descriptor: Arc<JobDescriptor>,
    pub schedule: Arc<CronSchedule>,
}

impl ScheduledJob {
    pub fn id(&self) -> JobId {
        self.descriptor.id()
    }

    /// Next firing strictly after now.
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        self.schedule.next_after(Utc::now())
    }
}
