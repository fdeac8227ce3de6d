//! `stackhand serve`.

use std::sync::Arc;

use tokio::sync::{broadcast::error::RecvError, oneshot};
use tracing::{error, info, warn};

use stackhand_api::{ApiError, ApiServer, AppState, ServerConfig};
use stackhand_config::Config;
use stackhand_cron::CronScheduler;
use stackhand_protocols::StackExecutor;

use crate::components;
use crate::signal::{ControlSignal, SignalHandler};

pub(crate) async fn run(
    mut config: Config,
    host: Option<String>,
    port: Option<u16>,
) -> Result<(), Box<dyn std::error::Error>> {
    if let Some(host) = host {
        config.http.host = host;
    }
    if let Some(port) = port {
        config.http.port = port;
    }

    info!("Starting StackHand v{}", env!("CARGO_PKG_VERSION"));
    info!(stacks_dir = %config.stacks_dir.display(), env_file = %config.env_file.display(), "Paths");

    let env_store = components::env_store();
    let executor: Arc<dyn StackExecutor> =
        Arc::new(components::executor(&config, env_store.clone(), false));
    let scheduler = Arc::new(components::scheduler(&config, executor.clone()));
    let runner = Arc::new(components::runner(&config, env_store, executor));

    let server_config = ServerConfig::new(config.http.host.clone(), config.http.port);
    let state = Arc::new(AppState::new(Arc::new(config), scheduler.clone(), runner));
    if state.token().is_none() {
        return Err(ApiError::MissingToken.into());
    }

    scheduler.start().await?;

    let signals = SignalHandler::new();
    signals.install()?;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    tokio::spawn(control_loop(signals, scheduler.clone(), shutdown_tx));

    let server = ApiServer::new(server_config, state);
    let result = server
        .run(async {
            let _ = shutdown_rx.await;
        })
        .await;

    scheduler.stop().await;
    info!("StackHand stopped");
    result.map_err(Into::into)
}

/// Reload on SIGHUP, shut down on SIGINT/SIGTERM.
async fn control_loop(
    signals: SignalHandler,
    scheduler: Arc<CronScheduler>,
    shutdown: oneshot::Sender<()>,
) {
    let mut rx = signals.subscribe();
    loop {
        match rx.recv().await {
            Ok(ControlSignal::Reload) => match scheduler.reload().await {
                Ok(count) => info!(jobs = count, "Cron jobs reloaded"),
                Err(e) => error!(error = %e, "Cron reload failed, previous jobs keep running"),
            },
            Ok(ControlSignal::Shutdown) => {
                info!("Shutting down");
                break;
            }
            Err(RecvError::Lagged(skipped)) => {
                warn!(skipped, "Signal receiver lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
    let _ = shutdown.send(());
}
