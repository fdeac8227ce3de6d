//! Job dispatch and execution.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tracing::{error, info};

use stackhand_protocols::{ExecRequest, OutputSink, StackExecutor, StackOperation};

use crate::job::{JobDescriptor, JobId};
use crate::single_flight::SingleFlight;
use crate::stats::SchedulerStats;

/// Result of asking for a job to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    /// An execution was spawned.
    Started,
    /// The job was already running; nothing was queued.
    Skipped,
}

/// How a single execution ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Succeeded,
    Failed,
    TimedOut,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Trigger {
    Schedule,
    Deploy,
    Manual,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Trigger::Schedule => "schedule",
            Trigger::Deploy => "run_on_deploy",
            Trigger::Manual => "manual",
        })
    }
}

/// Spawns job bodies behind the single-flight guard.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    executor: Arc<dyn StackExecutor>,
    docker: Arc<str>,
    timeout: Duration,
    guard: SingleFlight,
    stats: Arc<SchedulerStats>,
}

impl Dispatcher {
    pub fn new(executor: Arc<dyn StackExecutor>, docker: &str, timeout: Duration) -> Self {
        Self {
            executor,
            docker: Arc::from(docker),
            timeout,
            guard: SingleFlight::default(),
            stats: Arc::new(SchedulerStats::default()),
        }
    }

    pub fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    pub fn is_in_flight(&self, id: &JobId) -> bool {
        self.guard.is_running(id)
    }

    /// Start `job` in the background unless it is already running.
    pub fn dispatch(&self, job: Arc<JobDescriptor>, trigger: Trigger) -> DispatchOutcome {
        let Some(permit) = self.guard.try_acquire(job.id()) else {
            info!(
                stack = %job.stack,
                service = %job.service,
                trigger = %trigger,
                "Cron job still running, skipping"
            );
            self.stats.record_skipped();
            return DispatchOutcome::Skipped;
        };

        self.stats.record_dispatched();
        info!(stack = %job.stack, service = %job.service, trigger = %trigger, "Cron job started");

        let this = self.clone();
        tokio::spawn(async move {
            let _permit = permit;
            this.execute(&job).await;
        });
        DispatchOutcome::Started
    }

    /// Run the job body to completion under the command timeout.
    ///
    /// Failures are logged with captured output and never propagate.
    pub async fn execute(&self, job: &JobDescriptor) -> JobOutcome {
        let sink = OutputSink::new();
        let request = ExecRequest::for_stack(&job.stack)
            .with_operation(StackOperation::VarsOnly)
            .with_command(job.compose_command(&self.docker))
            .with_sink(sink.clone());

        let outcome = match tokio::time::timeout(self.timeout, self.executor.execute(request)).await {
            Ok(Ok(output)) => {
                let stdout = output.stdout.trim();
                if stdout.is_empty() {
                    info!(stack = %job.stack, service = %job.service, "Cron job finished");
                } else {
                    info!(stack = %job.stack, service = %job.service, output = %stdout, "Cron job finished");
                }
                JobOutcome::Succeeded
            }
            Ok(Err(e)) => {
                let (stdout, stderr) = e
                    .output()
                    .map(|o| (o.stdout.trim(), o.stderr.trim()))
                    .unwrap_or(("", ""));
                error!(
                    stack = %job.stack,
                    service = %job.service,
                    error = %e,
                    stdout = %stdout,
                    stderr = %stderr,
                    "Cron job failed"
                );
                JobOutcome::Failed
            }
            Err(_) => {
                let partial = sink.snapshot();
                error!(
                    stack = %job.stack,
                    service = %job.service,
                    timeout_secs = self.timeout.as_secs(),
                    stdout = %partial.stdout.trim(),
                    stderr = %partial.stderr.trim(),
                    "Cron job timed out"
                );
                JobOutcome::TimedOut
            }
        };

        match outcome {
            JobOutcome::Succeeded => self.stats.record_succeeded(),
            JobOutcome::Failed | JobOutcome::TimedOut => self.stats.record_failed(),
        }
        outcome
    }
}
