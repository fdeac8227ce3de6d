//! StackHand - cron discovery and tag-based deployments for docker compose stacks
//!
//! Main entry point for the StackHand CLI and server.

mod cli;
mod cmd_cron;
mod cmd_deploy;
mod cmd_run;
mod cmd_serve;
mod components;
mod signal;

use std::path::Path;

use clap::Parser;
use tracing::warn;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use stackhand_config::{ConfigLoader, ConfigValidator};

use crate::cli::{Cli, Commands, CronAction};

/// Initialize tracing with console output and, when `log_dir` is set, a
/// daily-rotated file.
fn init_tracing(log_dir: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let file_layer = match log_dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("stackhand")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            // Keep the writer alive for the program duration.
            static GUARD: std::sync::OnceLock<tracing_appender::non_blocking::WorkerGuard> =
                std::sync::OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let root = ConfigLoader::resolve_root(cli.root.as_deref())?;
    let config = ConfigLoader::load_for_root(&root, cli.config.as_deref())?;

    init_tracing(config.logging.dir.as_deref())?;

    for warning in ConfigValidator::validate(&config)?.into_result()? {
        warn!("{}: {}", warning.path, warning.message);
    }

    match cli.command {
        Commands::Serve { host, port } => cmd_serve::run(config, host, port).await,
        Commands::Deploy { stack, tag } => cmd_deploy::run(&config, &stack, &tag).await,
        Commands::Cron {
            action: CronAction::List { format },
        } => cmd_cron::list(&config, &format),
        Commands::Run {
            dry_run,
            tokens,
            command,
        } => cmd_run::run(&config, dry_run, &tokens, command).await,
    }
}
