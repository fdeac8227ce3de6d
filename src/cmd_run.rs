//! `stackhand run [--dry-run] <tokens...> [-- command...]`.

use stackhand_config::Config;
use stackhand_protocols::{ExecRequest, OutputMode, StackExecutor, StackOperation};

use crate::components;

pub(crate) async fn run(
    config: &Config,
    dry_run: bool,
    tokens: &[String],
    command: Vec<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let request = build_request(tokens, command)?;
    let executor = components::executor(config, components::env_store(), dry_run);

    // Step output streams straight through; only get-vars and dry-run
    // notes come back here.
    let output = executor.execute(request).await?;
    print!("{}", output.stdout);
    eprint!("{}", output.stderr);
    Ok(())
}

fn build_request(tokens: &[String], command: Vec<String>) -> Result<ExecRequest, String> {
    let mut request = ExecRequest::from_tokens(tokens).with_output(OutputMode::Inherit);
    if !command.is_empty() {
        request = request
            .with_operation(StackOperation::VarsOnly)
            .with_command(command);
    }
    if request.operations.is_empty() {
        return Err(
            "No operation given; use update, tear-down, backup, vars-only or get-vars".to_string(),
        );
    }
    Ok(request)
}
