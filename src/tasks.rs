use log::{info, warn};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cleanup;
use crate::config::Config;
use crate::monitoring::{self, SummaryReporter};
use crate::store::LogStore;

/// Handles to the retention sweeper and the summary reporter
pub struct BackgroundTasks {
    cancel: CancellationToken,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl BackgroundTasks {
    /// Spawn both daily loops on the current runtime
    pub fn start(config: &Config, store: LogStore) -> Self {
        let cancel = CancellationToken::new();

        let sweeper = tokio::spawn(cleanup::run_cleanup_loop(
            config.enhanced_dir(),
            config.retention(),
            cancel.child_token(),
        ));

        let reporter = SummaryReporter::new(
            store,
            config.slack_webhook_url.clone(),
            config.slack_channel.clone(),
        );
        let summary = tokio::spawn(monitoring::run_summary_loop(
            reporter,
            cancel.child_token(),
        ));

        Self {
            cancel,
            handles: vec![("cleanup", sweeper), ("summary", summary)],
        }
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Cancel the loops and wait for them to finish
    pub async fn shutdown(self) {
        self.cancel.cancel();
        for (name, handle) in self.handles {
            if let Err(e) = handle.await {
                warn!("Background task '{}' ended abnormally: {}", name, e);
            }
        }
        info!("Background tasks stopped");
    }
}
