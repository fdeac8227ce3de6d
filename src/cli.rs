//! CLI definitions for StackHand.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// StackHand CLI.
#[derive(Parser)]
#[command(name = "stackhand")]
#[command(about = "Cron discovery and tag-based deployments for docker compose stacks")]
#[command(version)]
pub(crate) struct Cli {
    /// Repository root holding the stacks directory and env file
    #[arg(long, env = "STACKHAND_ROOT", global = true)]
    pub root: Option<PathBuf>,

    /// Configuration file, relative to the root (default: stackhand.toml if present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Run the cron scheduler and the HTTP control surface
    Serve {
        /// Listen host (overrides http.host)
        #[arg(long)]
        host: Option<String>,

        /// Listen port (overrides http.port)
        #[arg(long)]
        port: Option<u16>,
    },

    /// Deploy an image tag to a stack, rolling back on failure
    Deploy {
        /// Stack name
        stack: String,

        /// Image tag to deploy
        tag: String,
    },

    /// Cron job commands
    Cron {
        #[command(subcommand)]
        action: CronAction,
    },

    /// Run stack operations
    ///
    /// Tokens select stacks (`all` or names) and operations
    /// (update, tear-down, backup, vars-only, get-vars). Everything after
    /// `--` is run with the stack's variables loaded.
    ///
    /// Examples:
    ///   stackhand run all update
    ///   stackhand run web vars-only -- env
    ///   stackhand run monitoring get-vars
    #[command(verbatim_doc_comment)]
    Run {
        /// Print the commands instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Stacks (`all` or names) and operations
        #[arg(required = true)]
        tokens: Vec<String>,

        /// Command to run with the stack's variables loaded
        #[arg(last = true)]
        command: Vec<String>,
    },
}

#[derive(Subcommand)]
pub(crate) enum CronAction {
    /// Discover and validate jobs, printing each with its next run
    List {
        /// Output format (table, json)
        #[arg(long, default_value = "table")]
        format: String,
    },
}
