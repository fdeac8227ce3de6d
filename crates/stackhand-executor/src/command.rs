//! Child process execution.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::Command;
use tracing::debug;

use stackhand_protocols::{ExecError, ExecOutput, OutputMode, OutputSink};

/// One external command run as a step of a stack operation.
#[derive(Debug, Clone)]
pub(crate) struct Step {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: PathBuf,
    pub env: Vec<(String, String)>,
}

impl Step {
    pub fn new(program: impl Into<String>, cwd: PathBuf, env: Vec<(String, String)>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd,
            env,
        }
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Shell-like rendering for logs and dry runs.
    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Run the step. The child is killed if the returned future is dropped.
    ///
    /// Captured output is forwarded to `sink` line by line as the child
    /// writes it, and also returned for this step alone.
    pub async fn run(&self, mode: OutputMode, sink: &OutputSink) -> Result<ExecOutput, ExecError> {
        debug!(command = %self.display(), cwd = %self.cwd.display(), "Running step");

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .current_dir(&self.cwd)
            .envs(self.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let spawn_err = |source| ExecError::Spawn {
            program: self.program.clone(),
            source,
        };

        let (status, output) = match mode {
            OutputMode::Capture => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
                let mut child = cmd.spawn().map_err(spawn_err)?;
                let stdout = child.stdout.take();
                let stderr = child.stderr.take();
                let (stdout, stderr, status) = tokio::join!(
                    drain(stdout, |chunk| sink.push_stdout(chunk)),
                    drain(stderr, |chunk| sink.push_stderr(chunk)),
                    child.wait(),
                );
                (status?, ExecOutput::new(stdout, stderr))
            }
            OutputMode::Inherit => {
                cmd.stdout(Stdio::inherit()).stderr(Stdio::inherit());
                let status = cmd.status().await.map_err(spawn_err)?;
                (status, ExecOutput::default())
            }
        };

        if status.success() {
            Ok(output)
        } else {
            Err(ExecError::CommandFailed {
                program: self.program.clone(),
                code: status.code(),
                output,
            })
        }
    }
}

/// Read `reader` to the end, handing each line to `emit` as it arrives.
async fn drain<R>(reader: Option<R>, emit: impl Fn(&str)) -> String
where
    R: AsyncRead + Unpin,
{
    let Some(reader) = reader else {
        return String::new();
    };
    let mut reader = BufReader::new(reader);
    let mut collected = String::new();
    let mut line = Vec::new();
    loop {
        line.clear();
        match reader.read_until(b'\n', &mut line).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&line);
                emit(&chunk);
                collected.push_str(&chunk);
            }
            Err(e) => {
                debug!(error = %e, "Stopped reading child output");
                break;
            }
        }
    }
    collected
}
