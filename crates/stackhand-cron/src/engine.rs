//! Timer engine for one active job set.
//!
//! The engine is a single task that sleeps until the earliest next firing,
//! dispatches every due job, and repeats until cancelled. Job bodies run in
//! their own tasks, so a slow job never delays the timers of others.

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::{debug, warn};

use crate::dispatch::{Dispatcher, Trigger};
use crate::job::ScheduledJob;

struct TimerEntry {
    job: ScheduledJob,
    next: Option<DateTime<Utc>>,
}

/// A running engine. Consumed by [`Engine::stop`]; dropping it cancels
/// the task without waiting.
pub(crate) struct Engine {
    jobs: Vec<ScheduledJob>,
    cancel: CancellationToken,
    handle: JoinHandle<()>,
    _drop_guard: DropGuard,
}

impl Engine {
    /// Spawn the engine task with one timer per job.
    pub fn start(jobs: Vec<ScheduledJob>, dispatcher: Dispatcher) -> Self {
        let cancel = CancellationToken::new();
        let now = Utc::now();
        let entries: Vec<TimerEntry> = jobs
            .iter()
            .map(|job| TimerEntry {
                job: job.clone(),
                next: job.schedule.next_after(now),
            })
            .collect();

        let handle = tokio::spawn(run(entries, dispatcher, cancel.clone()));
        Self {
            jobs,
            _drop_guard: cancel.clone().drop_guard(),
            cancel,
            handle,
        }
    }

    pub fn jobs(&self) -> &[ScheduledJob] {
        &self.jobs
    }

    /// Number of timers the engine holds.
    pub fn timer_count(&self) -> usize {
        self.jobs.len()
    }

    /// Cancel the engine and wait for its task to exit.
    ///
    /// In-flight job bodies are not awaited.
    pub async fn stop(self) {
        self.cancel.cancel();
        if let Err(e) = self.handle.await {
            warn!(error = %e, "Cron engine task ended abnormally");
        }
    }
}

async fn run(mut entries: Vec<TimerEntry>, dispatcher: Dispatcher, cancel: CancellationToken) {
    loop {
        let Some(due_at) = entries.iter().filter_map(|e| e.next).min() else {
            debug!("No upcoming cron firings, engine idle");
            cancel.cancelled().await;
            break;
        };

        let wait = (due_at - Utc::now()).to_std().unwrap_or_default();
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = tokio::time::sleep(wait) => {}
        }

        let now = Utc::now();
        for entry in entries.iter_mut() {
            let Some(scheduled) = entry.next else { continue };
            if scheduled > now {
                continue;
            }
            dispatcher.dispatch(entry.job.descriptor.clone(), Trigger::Schedule);

            // Advance from the scheduled time; if that is already past, from now.
            entry.next = entry
                .job
                .schedule
                .next_after(scheduled)
                .filter(|next| *next > now)
                .or_else(|| entry.job.schedule.next_after(now));
        }
    }
    debug!("Cron engine stopped");
}
