//! Background expiry sweep for the memory store.
//!
//! Periodically drops idle sessions and purges expired items. The task is
//! owned by a [`CleanupHandle`]; stopping it cancels a cooperative token and
//! waits for the loop to exit.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::memory::core::config::MemoryConfig;
use crate::memory::store::{MemoryStore, SweepStats};

/// Configuration for background cleanup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupConfig {
    /// Interval between sweeps.
    pub interval: Duration,
    /// Whether background cleanup is enabled.
    pub enabled: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self::from(&MemoryConfig::default())
    }
}

impl From<&MemoryConfig> for CleanupConfig {
    fn from(config: &MemoryConfig) -> Self {
        Self {
            interval: config.cleanup_interval,
            enabled: true,
        }
    }
}

/// Background cleanup worker for memory maintenance.
pub struct BackgroundCleanup {
    store: Arc<MemoryStore>,
    config: CleanupConfig,
    shutdown: CancellationToken,
}

impl BackgroundCleanup {
    /// Create a new background cleanup worker.
    #[must_use]
    pub fn new(store: Arc<MemoryStore>, config: CleanupConfig) -> Self {
        Self {
            store,
            config,
            shutdown: CancellationToken::new(),
        }
    }

    /// Stop the worker when `parent` is cancelled as well.
    #[must_use]
    pub fn with_parent(mut self, parent: &CancellationToken) -> Self {
        self.shutdown = parent.child_token();
        self
    }

    /// Spawn the sweep loop as a tokio task.
    #[must_use]
    pub fn spawn(self) -> CleanupHandle {
        let token = self.shutdown.clone();
        let join = tokio::spawn(async move {
            self.run().await;
        });
        CleanupHandle { token, join }
    }

    async fn run(&self) {
        if !self.config.enabled {
            info!("Background cleanup is disabled");
            return;
        }

        let interval = self.config.interval;
        info!(?interval, "Starting background cleanup worker");

        loop {
            tokio::select! {
                () = self.shutdown.cancelled() => {
                    info!("Background cleanup worker shutting down");
                    break;
                }
                () = tokio::time::sleep(interval) => {
                    let stats = self.run_cleanup().await;
                    if stats.removed_anything() {
                        info!(
                            sessions = stats.sessions_expired,
                            items = stats.items_expired,
                            duration_us = u64::try_from(stats.duration.as_micros()).unwrap_or(u64::MAX),
                            "Cleanup completed"
                        );
                    } else {
                        debug!("Cleanup completed with nothing to remove");
                    }
                }
            }
        }
    }

    /// Run a single sweep.
    pub async fn run_cleanup(&self) -> SweepStats {
        self.store.sweep().await
    }
}

/// Owner of a running cleanup task.
#[derive(Debug)]
pub struct CleanupHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl CleanupHandle {
    /// Token that stops the worker when cancelled.
    #[must_use]
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }

    /// Whether the worker loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Signal the worker and wait for it to exit.
    pub async fn stop(self) {
        self.token.cancel();
        if let Err(err) = self.join.await {
            warn!(?err, "Background cleanup task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::core::ids::SessionId;
    use crate::memory::core::kinds::MemoryType;
    use crate::memory::store::NewMemory;

    fn new_store(config: MemoryConfig) -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(config).unwrap_or_else(|err| unreachable!("{err}")))
    }

    #[test]
    fn test_config_follows_memory_config() {
        let memory = MemoryConfig::default().with_cleanup_interval(Duration::from_secs(42));
        let config = CleanupConfig::from(&memory);
        assert_eq!(config.interval, Duration::from_secs(42));
        assert!(config.enabled);
    }

    #[tokio::test]
    async fn test_stop_is_prompt() {
        let config = CleanupConfig {
            interval: Duration::from_secs(3600),
            enabled: true,
        };
        let handle = BackgroundCleanup::new(new_store(MemoryConfig::default()), config).spawn();
        let stopped = tokio::time::timeout(Duration::from_secs(1), handle.stop()).await;
        assert!(stopped.is_ok());
    }

    #[tokio::test]
    async fn test_parent_cancellation_stops_worker() {
        let parent = CancellationToken::new();
        let handle = BackgroundCleanup::new(new_store(MemoryConfig::default()), CleanupConfig::default())
            .with_parent(&parent)
            .spawn();
        parent.cancel();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }

    #[tokio::test]
    async fn test_worker_sweeps_idle_sessions() {
        let memory = MemoryConfig::default()
            .with_ttls(Duration::from_millis(20), Duration::from_millis(20))
            .with_cleanup_interval(Duration::from_millis(30));
        let store = new_store(memory.clone());
        let sid = SessionId::new("sweep").unwrap_or_else(|err| unreachable!("{err}"));
        let _ = store.store(NewMemory::new(sid, MemoryType::Working, "w")).await;

        let handle = BackgroundCleanup::new(Arc::clone(&store), CleanupConfig::from(&memory)).spawn();
        tokio::time::sleep(Duration::from_millis(200)).await;
        handle.stop().await;

        assert_eq!(store.session_counts().await, (0, 0));
    }

    #[tokio::test]
    async fn test_disabled_worker_exits_immediately() {
        let config = CleanupConfig {
            interval: Duration::from_secs(1),
            enabled: false,
        };
        let handle = BackgroundCleanup::new(new_store(MemoryConfig::default()), config).spawn();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(handle.is_finished());
    }
}
