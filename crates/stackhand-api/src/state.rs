//! Application state.

use std::sync::Arc;
use std::time::{Duration, Instant};

use stackhand_config::Config;
use stackhand_cron::CronScheduler;
use stackhand_deploy::DeployRunner;
use stackhand_protocols::StackDeployment;

/// Application state shared across handlers.
pub struct AppState {
    pub scheduler: Arc<CronScheduler>,
    pub runner: Arc<DeployRunner>,
    config: Arc<Config>,
    start_time: Instant,
}

impl AppState {
    pub fn new(config: Arc<Config>, scheduler: Arc<CronScheduler>, runner: Arc<DeployRunner>) -> Self {
        Self {
            scheduler,
            runner,
            config,
            start_time: Instant::now(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Configured bearer token, if any. A blank token counts as unset.
    pub fn token(&self) -> Option<&str> {
        self.config
            .http
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
    }

    /// Deployment metadata for `stack`, falling back to the defaults.
    pub fn deployment(&self, stack: &str) -> StackDeployment {
        self.config.stack_deployment(stack)
    }

    pub fn uptime(&self) -> Duration {
        self.start_time.elapsed()
    }
}
