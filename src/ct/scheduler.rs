// Poll Scheduler
//
// Owns the set of log pollers: obtains the usable-log list, caps it at the
// worker limit, launches one poller per log, and propagates shutdown.

use super::directory::LogDirectory;
use super::poller::{LogPoller, PollerConfig};
use crate::stream::broker::FanOutBroker;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

/// Supervises the per-log pollers
///
/// A poller that exits is not respawned; the log stays disabled until the
/// process restarts.
pub struct PollScheduler {
    list_url: String,
    max_workers: usize,
    config: PollerConfig,
    shutdown: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl PollScheduler {
    pub fn new(list_url: &str, max_workers: usize, config: PollerConfig) -> Self {
        Self {
            list_url: list_url.to_string(),
            max_workers,
            config,
            shutdown: Arc::new(AtomicBool::new(false)),
            handles: Vec::new(),
        }
    }

    /// Fetch the log list and launch one poller per usable log
    ///
    /// Returns the number of pollers started. An empty log list is a startup
    /// error: it is logged and zero pollers run, but the caller's HTTP
    /// surface stays up.
    pub async fn start(&mut self, broker: Arc<FanOutBroker>) -> usize {
        let mut logs = LogDirectory::new(&self.list_url).list().await;

        if logs.is_empty() {
            error!("No usable CT logs available; pollers not started");
            return 0;
        }

        if logs.len() > self.max_workers {
            warn!(
                "Capping {} usable logs at {} workers",
                logs.len(),
                self.max_workers
            );
            logs.truncate(self.max_workers);
        }

        for descriptor in logs {
            let poller = LogPoller::new(
                descriptor,
                Arc::clone(&broker),
                self.config.clone(),
                Arc::clone(&self.shutdown),
            );
            self.handles.push(tokio::spawn(poller.run()));
        }

        info!("Started {} log pollers", self.handles.len());
        self.handles.len()
    }

    /// Signal every poller to stop and wait for all of them to drain
    pub async fn stop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);

        for handle in self.handles.drain(..) {
            if let Err(e) = handle.await {
                error!("Poller task failed: {}", e);
            }
        }

        info!("All pollers stopped");
    }

    /// Shared shutdown flag, for wiring auxiliary tasks to the same signal
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }
}
