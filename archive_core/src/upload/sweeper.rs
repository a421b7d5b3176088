use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::upload::sessions::UploadSessions;

pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(10 * 60);
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);

#[derive(Clone, Debug)]
pub struct SweeperConfig {
    /// How often stale sessions are looked for.
    pub interval: Duration,
    /// Sessions older than this are dropped, whatever stage they reached.
    pub max_age: Duration,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_SWEEP_INTERVAL,
            max_age: DEFAULT_SESSION_TTL,
        }
    }
}

/// Handle to the background task that evicts expired upload sessions.
///
/// Dropping the handle leaves the task running; call [`SessionSweeper::shutdown`]
/// to stop it and wait for it to exit.
pub struct SessionSweeper {
    cancellation: CancellationToken,
    handle: JoinHandle<()>,
}

impl SessionSweeper {
    pub fn spawn(sessions: Arc<UploadSessions>, config: SweeperConfig) -> Self {
        let cancellation = CancellationToken::new();
        let handle = tokio::spawn(run(sessions, config, cancellation.clone()));
        Self {
            cancellation,
            handle,
        }
    }

    #[cfg(test)]
    pub(crate) fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    #[cfg(test)]
    pub(crate) fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub async fn shutdown(self) {
        self.cancellation.cancel();
        if let Err(e) = self.handle.await {
            log::error!("Upload session sweeper exited abnormally: {}", e);
        }
    }
}

async fn run(sessions: Arc<UploadSessions>, config: SweeperConfig, cancellation: CancellationToken) {
    // The first sweep happens one full interval after start.
    let mut interval = tokio::time::interval_at(Instant::now() + config.interval, config.interval);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    log::info!(
        "Upload session sweeper started (interval {:?}, max age {:?})",
        config.interval,
        config.max_age
    );

    loop {
        tokio::select! {
            _ = cancellation.cancelled() => {
                log::info!("Upload session sweeper shutting down");
                break;
            }
            _ = interval.tick() => {
                let removed = sessions.sweep_expired(config.max_age, Utc::now());
                if removed > 0 {
                    log::debug!(
                        "Swept {} expired upload sessions, {} still open",
                        removed,
                        sessions.len()
                    );
                }
            }
        }
    }
}
