//! Process signal handling for `serve`.

use std::fmt;

use tokio::sync::broadcast;
use tracing::{debug, info};

/// Control signal delivered to the serve loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ControlSignal {
    /// Stop the scheduler and exit (SIGTERM, SIGINT).
    Shutdown,
    /// Rediscover cron jobs (SIGHUP).
    Reload,
}

impl fmt::Display for ControlSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlSignal::Shutdown => write!(f, "SHUTDOWN"),
            ControlSignal::Reload => write!(f, "RELOAD"),
        }
    }
}

/// Fans OS signals out to subscribers.
#[derive(Clone)]
pub(crate) struct SignalHandler {
    sender: broadcast::Sender<ControlSignal>,
}

impl SignalHandler {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(16);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ControlSignal> {
        self.sender.subscribe()
    }

    pub fn send(&self, signal: ControlSignal) {
        debug!("Sending signal: {}", signal);
        let _ = self.sender.send(signal);
    }

    /// Install SIGTERM, SIGINT and SIGHUP listeners.
    #[cfg(unix)]
    pub fn install(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        for (kind, name, control) in [
            (SignalKind::terminate(), "SIGTERM", ControlSignal::Shutdown),
            (SignalKind::interrupt(), "SIGINT", ControlSignal::Shutdown),
            (SignalKind::hangup(), "SIGHUP", ControlSignal::Reload),
        ] {
            let mut stream = signal(kind)?;
            let handler = self.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    info!("Received {}", name);
                    handler.send(control);
                }
            });
        }

        info!("Signal handlers installed (SIGTERM, SIGINT, SIGHUP)");
        Ok(())
    }

    /// Only Ctrl+C is available off Unix.
    #[cfg(not(unix))]
    pub fn install(&self) -> std::io::Result<()> {
        let handler = self.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Received Ctrl+C");
                handler.send(ControlSignal::Shutdown);
            }
        });
        Ok(())
    }
}
