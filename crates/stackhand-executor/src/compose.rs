//! `docker compose` backed stack executor.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tracing::{info, warn};

use stackhand_envfile::parse;
use stackhand_protocols::{
    EnvStore, ExecError, ExecOutput, ExecRequest, OutputMode, OutputSink, StackEnvironment,
    StackExecutor, StackOperation,
};

use crate::command::Step;
use crate::stacks::{self, ResolvedStack};
use crate::vars::referenced_vars;

/// Settings for a [`ComposeExecutor`].
#[derive(Debug, Clone)]
pub struct ComposeExecutorConfig {
    pub stacks_dir: PathBuf,
    pub env_file: PathBuf,
    pub backup_dir: PathBuf,
    /// Compose file name inside each stack directory.
    pub compose_file: String,
    /// Docker CLI binary.
    pub docker: String,
    /// Log each step instead of running it.
    pub dry_run: bool,
    /// Configured variables, storage pools and custom paths.
    pub environment: StackEnvironment,
}

impl ComposeExecutorConfig {
    pub fn new(stacks_dir: impl Into<PathBuf>, env_file: impl Into<PathBuf>) -> Self {
        Self {
            stacks_dir: stacks_dir.into(),
            backup_dir: PathBuf::from("backups"),
            env_file: env_file.into(),
            compose_file: "docker-compose.yml".to_string(),
            docker: "docker".to_string(),
            dry_run: false,
            environment: StackEnvironment::default(),
        }
    }

    pub fn with_backup_dir(mut self, backup_dir: impl Into<PathBuf>) -> Self {
        self.backup_dir = backup_dir.into();
        self
    }

    pub fn with_compose_file(mut self, compose_file: impl Into<String>) -> Self {
        self.compose_file = compose_file.into();
        self
    }

    pub fn with_docker(mut self, docker: impl Into<String>) -> Self {
        self.docker = docker.into();
        self
    }

    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn with_environment(mut self, environment: StackEnvironment) -> Self {
        self.environment = environment;
        self
    }
}

/// Stack executor driving the `docker compose` CLI.
pub struct ComposeExecutor {
    config: ComposeExecutorConfig,
    env_store: Arc<dyn EnvStore>,
}

impl ComposeExecutor {
    pub fn new(config: ComposeExecutorConfig, env_store: Arc<dyn EnvStore>) -> Self {
        Self { config, env_store }
    }

    pub fn config(&self) -> &ComposeExecutorConfig {
        &self.config
    }

    async fn run_stack(
        &self,
        stack: &ResolvedStack,
        request: &ExecRequest,
        out: &OutputSink,
    ) -> Result<(), ExecError> {
        let env = self.child_env(stack)?;

        for op in &request.operations {
            info!(stack = %stack.name, operation = %op, "Running stack operation");
            match op {
                StackOperation::GetVars => self.get_vars(stack, out)?,
                StackOperation::TearDown => {
                    let step = self.compose_step(stack, &env).args(["down"]);
                    self.run_step(step, request.output, out).await?;
                }
                StackOperation::Backup => {
                    let step = self.backup_step(stack, &env).await?;
                    self.run_step(step, request.output, out).await?;
                }
                StackOperation::Update => {
                    let pull = self.compose_step(stack, &env).args(["pull"]);
                    self.run_step(pull, request.output, out).await?;
                    let up = self
                        .compose_step(stack, &env)
                        .args(["up", "-d", "--remove-orphans"]);
                    self.run_step(up, request.output, out).await?;
                }
                StackOperation::VarsOnly => {
                    let step = self.vars_only_step(stack, &env, &request.command)?;
                    self.run_step(step, request.output, out).await?;
                }
            }
        }
        Ok(())
    }

    async fn run_step(
        &self,
        step: Step,
        mode: OutputMode,
        out: &OutputSink,
    ) -> Result<(), ExecError> {
        if self.config.dry_run {
            info!(command = %step.display(), cwd = %step.cwd.display(), "Dry run, skipping");
            out.push_stdout(&format!("[dry-run] {}\n", step.display()));
            return Ok(());
        }
        match step.run(mode, out).await {
            Ok(_) => Ok(()),
            // The reported output covers every step run so far.
            Err(ExecError::CommandFailed { program, code, .. }) => Err(ExecError::CommandFailed {
                program,
                code,
                output: out.snapshot(),
            }),
            Err(e) => Err(e),
        }
    }

    /// Variables for the stack's child processes. Later entries win:
    /// configured variables, then the env file, then `STACK_STORAGE_*`,
    /// `STACK_PATH_*`, `STACK_NAME` and `STACK_DIR`.
    fn child_env(&self, stack: &ResolvedStack) -> Result<Vec<(String, String)>, ExecError> {
        let content = self.env_store.read(&self.config.env_file)?;
        let environment = &self.config.environment;
        let mut env = environment.vars_for(&stack.name);
        env.extend(parse(&content));
        env.extend(environment.paths_for(&stack.name));
        env.push(("STACK_NAME".to_string(), stack.name.clone()));
        env.push(("STACK_DIR".to_string(), stack.dir.display().to_string()));
        Ok(env)
    }

    fn compose_step(&self, stack: &ResolvedStack, env: &[(String, String)]) -> Step {
        Step::new(&self.config.docker, stack.dir.clone(), env.to_vec()).args([
            "compose".to_string(),
            "--file".to_string(),
            stack.compose_file.display().to_string(),
        ])
    }

    async fn backup_step(
        &self,
        stack: &ResolvedStack,
        env: &[(String, String)],
    ) -> Result<Step, ExecError> {
        if !self.config.dry_run {
            tokio::fs::create_dir_all(&self.config.backup_dir).await?;
        }
        let archive = self.config.backup_dir.join(format!(
            "{}-{}.tar.gz",
            stack.name,
            Utc::now().format("%Y%m%dT%H%M%SZ")
        ));
        Ok(Step::new("tar", stack.dir.clone(), env.to_vec()).args([
            "-czf".to_string(),
            archive.display().to_string(),
            "-C".to_string(),
            self.config.stacks_dir.display().to_string(),
            stack.name.clone(),
        ]))
    }

    fn vars_only_step(
        &self,
        stack: &ResolvedStack,
        env: &[(String, String)],
        command: &[String],
    ) -> Result<Step, ExecError> {
        match command {
            [] => Err(ExecError::MissingCommand),
            // A single token may carry pipes or redirections.
            [line] => Ok(Step::new("sh", stack.dir.clone(), env.to_vec()).args(["-c", line.as_str()])),
            [program, args @ ..] => {
                Ok(Step::new(program.as_str(), stack.dir.clone(), env.to_vec()).args(args.iter().cloned()))
            }
        }
    }

    /// Append `VAR=` for every compose reference missing from the env file.
    fn get_vars(&self, stack: &ResolvedStack, out: &OutputSink) -> Result<(), ExecError> {
        let compose = std::fs::read_to_string(&stack.compose_file)?;
        let existing = self.env_store.read(&self.config.env_file)?;
        let known: Vec<String> = parse(&existing).into_iter().map(|(k, _)| k).collect();

        let missing: Vec<String> = referenced_vars(&compose)
            .into_iter()
            .filter(|name| !known.contains(name))
            .collect();

        if missing.is_empty() {
            info!(stack = %stack.name, "No missing variables");
            return Ok(());
        }

        for name in &missing {
            if self.config.dry_run {
                out.push_stdout(&format!("[dry-run] add {}=\n", name));
                continue;
            }
            self.env_store.update(&self.config.env_file, name, "")?;
            out.push_stdout(&format!("added {}=\n", name));
        }
        info!(stack = %stack.name, count = missing.len(), "Appended missing variables");
        Ok(())
    }
}

#[async_trait]
impl StackExecutor for ComposeExecutor {
    async fn execute(&self, request: ExecRequest) -> Result<ExecOutput, ExecError> {
        if request.operations.contains(&StackOperation::VarsOnly) && request.command.is_empty() {
            return Err(ExecError::MissingCommand);
        }

        let stacks = stacks::resolve(
            &self.config.stacks_dir,
            &self.config.compose_file,
            &request.target,
        )?;

        if request.operations.is_empty() {
            warn!("No operations requested");
            return Ok(ExecOutput::default());
        }

        let out = request.sink.clone().unwrap_or_default();
        for stack in &stacks {
            self.run_stack(stack, &request, &out).await?;
        }
        Ok(out.snapshot())
    }
}

#[cfg(test)]
#[path = "compose_tests.rs"]
mod tests;
