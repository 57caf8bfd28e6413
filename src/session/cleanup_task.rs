use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, instrument};

use super::service::SessionManager;

/// Configuration for the idle-session expiry task
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// How often to sweep the session registry
    pub cleanup_interval: Duration,
    /// How long a session may sit without activity before it is cancelled
    pub inactivity_threshold: Duration,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(5 * 60),
            inactivity_threshold: Duration::from_secs(2 * 60 * 60),
        }
    }
}

/// Periodically cancels sessions nobody has touched for a while.
///
/// Runs until the surrounding task is aborted.
#[instrument(skip(manager))]
pub async fn start_cleanup_task(manager: Arc<SessionManager>, config: CleanupConfig) {
    info!(
        cleanup_interval_secs = config.cleanup_interval.as_secs(),
        inactivity_threshold_secs = config.inactivity_threshold.as_secs(),
        "Starting idle session expiry task"
    );

    let mut cleanup_interval = interval(config.cleanup_interval);

    loop {
        cleanup_interval.tick().await;

        let expired = manager
            .expire_idle_sessions(config.inactivity_threshold)
            .await;
        if expired > 0 {
            info!(expired, "Idle sessions expired");
        } else {
            debug!("No idle sessions to expire");
        }
    }
}
