//! `stackhand deploy <stack> <tag>`.

use std::sync::Arc;

use stackhand_config::Config;
use stackhand_deploy::DeployError;
use stackhand_protocols::StackExecutor;

use crate::components;

pub(crate) async fn run(config: &Config, stack: &str, tag: &str) -> Result<(), Box<dyn std::error::Error>> {
    let env_store = components::env_store();
    let executor: Arc<dyn StackExecutor> =
        Arc::new(components::executor(config, env_store.clone(), false));
    let runner = components::runner(config, env_store, executor);

    let deployment = config.stack_deployment(stack);
    match runner.deploy(stack, &deployment, tag).await {
        Ok(result) => {
            println!("{}", serde_json::to_string_pretty(&result)?);
            Ok(())
        }
        Err(DeployError::Failed(failure)) => {
            println!("{}", serde_json::to_string_pretty(&failure)?);
            Err(DeployError::Failed(failure).into())
        }
        Err(e) => Err(e.into()),
    }
}
