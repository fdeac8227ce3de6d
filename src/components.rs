//! Wiring of the core components from configuration.

use std::sync::Arc;

use stackhand_config::Config;
use stackhand_cron::{CronScheduler, SchedulerOptions};
use stackhand_deploy::DeployRunner;
use stackhand_envfile::FileEnvStore;
use stackhand_executor::{ComposeExecutor, ComposeExecutorConfig};
use stackhand_protocols::{EnvStore, StackExecutor};

pub(crate) fn env_store() -> Arc<dyn EnvStore> {
    Arc::new(FileEnvStore::new())
}

pub(crate) fn executor(config: &Config, env_store: Arc<dyn EnvStore>, dry_run: bool) -> ComposeExecutor {
    let executor_config = ComposeExecutorConfig::new(&config.stacks_dir, &config.env_file)
        .with_backup_dir(&config.executor.backup_dir)
        .with_compose_file(&config.executor.compose_file)
        .with_docker(&config.executor.docker)
        .with_environment(config.stack_environment())
        .with_dry_run(dry_run);
    ComposeExecutor::new(executor_config, env_store)
}

pub(crate) fn scheduler(config: &Config, executor: Arc<dyn StackExecutor>) -> CronScheduler {
    let options = SchedulerOptions::default()
        .with_compose_file(&config.executor.compose_file)
        .with_docker(&config.executor.docker)
        .with_command_timeout(config.command_timeout());
    CronScheduler::new(&config.stacks_dir, executor, options)
}

pub(crate) fn runner(
    config: &Config,
    env_store: Arc<dyn EnvStore>,
    executor: Arc<dyn StackExecutor>,
) -> DeployRunner {
    DeployRunner::new(&config.env_file, env_store, executor).with_command_timeout(config.command_timeout())
}
