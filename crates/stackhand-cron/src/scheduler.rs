//! Cron scheduler lifecycle.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{info, warn};

use stackhand_protocols::StackExecutor;

use crate::discovery::discover;
use crate::dispatch::{DispatchOutcome, Dispatcher, JobOutcome, Trigger};
use crate::engine::Engine;
use crate::error::CronError;
use crate::job::{JobDescriptor, JobId, ScheduledJob};
use crate::schedule::CronSchedule;
use crate::stats::StatsSnapshot;

/// Scheduler settings.
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    /// Compose file name inside each stack directory.
    pub compose_file: String,
    /// Docker CLI binary used in job commands.
    pub docker: String,
    /// Ceiling for a single job execution.
    pub command_timeout: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            compose_file: "docker-compose.yml".to_string(),
            docker: "docker".to_string(),
            command_timeout: Duration::from_secs(15 * 60),
        }
    }
}

impl SchedulerOptions {
    pub fn with_compose_file(mut self, compose_file: impl Into<String>) -> Self {
        self.compose_file = compose_file.into();
        self
    }

    pub fn with_docker(mut self, docker: impl Into<String>) -> Self {
        self.docker = docker.into();
        self
    }

    pub fn with_command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerStatus {
    Stopped,
    Running,
}

enum SchedulerState {
    Stopped,
    Running(Engine),
}

/// Discover jobs and validate every schedule.
///
/// Fails on the first invalid schedule, so a returned plan is always
/// fully schedulable.
pub fn plan(stacks_dir: &Path, compose_file: &str) -> Result<Vec<ScheduledJob>, CronError> {
    discover(stacks_dir, compose_file)?
        .into_iter()
        .map(|descriptor| {
            let schedule =
                CronSchedule::parse(&descriptor.schedule).map_err(|source| CronError::InvalidSchedule {
                    stack: descriptor.stack.clone(),
                    service: descriptor.service.clone(),
                    schedule: descriptor.schedule.clone(),
                    source,
                })?;
            Ok(ScheduledJob {
                descriptor: Arc::new(descriptor),
                schedule: Arc::new(schedule),
            })
        })
        .collect()
}

/// Runs label-declared cron jobs for every stack.
///
/// `start`, `stop` and `reload` serialize on one lock and never wait for
/// job bodies. The single-flight guard and counters live for the whole
/// lifetime of the scheduler, across reloads.
pub struct CronScheduler {
    stacks_dir: PathBuf,
    options: SchedulerOptions,
    dispatcher: Dispatcher,
    state: Mutex<SchedulerState>,
}

impl CronScheduler {
    pub fn new(
        stacks_dir: impl Into<PathBuf>,
        executor: Arc<dyn StackExecutor>,
        options: SchedulerOptions,
    ) -> Self {
        let dispatcher = Dispatcher::new(executor, &options.docker, options.command_timeout);
        Self {
            stacks_dir: stacks_dir.into(),
            options,
            dispatcher,
            state: Mutex::new(SchedulerState::Stopped),
        }
    }

    /// Discover, validate and activate jobs. Returns the number of jobs.
    ///
    /// A no-op when already running. If any schedule is invalid nothing is
    /// registered and the scheduler stays stopped.
    pub async fn start(&self) -> Result<usize, CronError> {
        let mut state = self.state.lock().await;
        if let SchedulerState::Running(engine) = &*state {
            return Ok(engine.timer_count());
        }
        let jobs = plan(&self.stacks_dir, &self.options.compose_file)?;
        Ok(self.activate(&mut state, jobs))
    }

    /// Stop the engine. Idempotent.
    pub async fn stop(&self) {
        let mut state = self.state.lock().await;
        if let SchedulerState::Running(engine) = std::mem::replace(&mut *state, SchedulerState::Stopped) {
            engine.stop().await;
            info!("Cron scheduler stopped");
        }
    }

    /// Rediscover jobs and swap them in.
    ///
    /// On failure the active job set keeps running untouched. When stopped
    /// this behaves like [`start`](Self::start).
    pub async fn reload(&self) -> Result<usize, CronError> {
        let mut state = self.state.lock().await;
        let jobs = match plan(&self.stacks_dir, &self.options.compose_file) {
            Ok(jobs) => jobs,
            Err(e) => {
                warn!(error = %e, "Cron reload failed, keeping current jobs");
                return Err(e);
            }
        };

        if let SchedulerState::Running(engine) = std::mem::replace(&mut *state, SchedulerState::Stopped) {
            engine.stop().await;
        }
        Ok(self.activate(&mut state, jobs))
    }

    fn activate(&self, state: &mut SchedulerState, jobs: Vec<ScheduledJob>) -> usize {
        if jobs.is_empty() {
            info!("No cron-enabled services detected");
        }
        for job in &jobs {
            info!(
                stack = %job.descriptor.stack,
                service = %job.descriptor.service,
                schedule = %job.schedule,
                "Scheduled cron job"
            );
        }

        let on_deploy: Vec<Arc<JobDescriptor>> = jobs
            .iter()
            .filter(|job| job.descriptor.run_on_deploy)
            .map(|job| Arc::clone(&job.descriptor))
            .collect();
        let count = jobs.len();

        *state = SchedulerState::Running(Engine::start(jobs, self.dispatcher.clone()));

        for job in on_deploy {
            info!(stack = %job.stack, service = %job.service, "Run-on-deploy cron job triggered");
            self.dispatcher.dispatch(job, Trigger::Deploy);
        }

        info!(jobs = count, "Cron scheduler started");
        count
    }

    pub async fn status(&self) -> SchedulerStatus {
        match &*self.state.lock().await {
            SchedulerState::Stopped => SchedulerStatus::Stopped,
            SchedulerState::Running(_) => SchedulerStatus::Running,
        }
    }

    /// Active jobs, empty when stopped.
    pub async fn jobs(&self) -> Vec<ScheduledJob> {
        match &*self.state.lock().await {
            SchedulerState::Stopped => Vec::new(),
            SchedulerState::Running(engine) => engine.jobs().to_vec(),
        }
    }

    pub async fn timer_count(&self) -> usize {
        match &*self.state.lock().await {
            SchedulerState::Stopped => 0,
            SchedulerState::Running(engine) => engine.timer_count(),
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.dispatcher.stats().snapshot()
    }

    /// Whether an execution of `id` is currently in flight.
    pub fn is_in_flight(&self, id: &JobId) -> bool {
        self.dispatcher.is_in_flight(id)
    }

    /// Trigger an active job now, through the single-flight guard.
    pub async fn run_now(&self, id: &JobId) -> Result<DispatchOutcome, CronError> {
        let job = match &*self.state.lock().await {
            SchedulerState::Running(engine) => engine
                .jobs()
                .iter()
                .find(|job| job.descriptor.stack == id.stack && job.descriptor.service == id.service)
                .map(|job| Arc::clone(&job.descriptor)),
            SchedulerState::Stopped => None,
        };
        let job = job.ok_or_else(|| CronError::UnknownJob(id.clone()))?;
        Ok(self.dispatcher.dispatch(job, Trigger::Manual))
    }

    /// Run one job body to completion, bypassing timers and the guard.
    pub async fn execute(&self, job: &JobDescriptor) -> JobOutcome {
        self.dispatcher.execute(job).await
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
