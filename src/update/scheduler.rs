use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::UpdateChecker;
use crate::config::StoreConfig;
use crate::error::Result;
use crate::install::{InstallCoordinator, installed_extensions_async};
use crate::models::InstalledExtension;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdleState {
    Active,
    Idle,
    Locked,
}

/// Host hook reporting whether the user is at the machine.
#[async_trait]
pub trait IdleProbe: Send + Sync {
    async fn idle_state(&self, threshold: Duration) -> IdleState;
}

/// Probe for hosts without idle detection.
pub struct AlwaysActive;

#[async_trait]
impl IdleProbe for AlwaysActive {
    async fn idle_state(&self, _threshold: Duration) -> IdleState {
        IdleState::Active
    }
}

/// Per-scheduler update bookkeeping. Nothing here outlives the process.
#[derive(Debug)]
pub struct UpdaterState {
    session_id: String,
    last_check: Option<Instant>,
}

impl UpdaterState {
    pub fn new() -> Self {
        Self {
            session_id: format!("{{{}}}", Uuid::new_v4()),
            last_check: None,
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn last_check(&self) -> Option<Instant> {
        self.last_check
    }

    fn is_due(&self, now: Instant, min_interval: Duration) -> bool {
        self.last_check
            .is_none_or(|last| now.saturating_duration_since(last) >= min_interval)
    }
}

impl Default for UpdaterState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    SkippedIdle(IdleState),
    SkippedInterval,
    Checked { updated: usize, failed: usize },
}

/// Runs update checks on a timer and on host activation, at most once per
/// `min_interval`, and only while the system reports itself active.
pub struct UpdateScheduler {
    config: StoreConfig,
    coordinator: Arc<InstallCoordinator>,
    checker: UpdateChecker,
    idle: Arc<dyn IdleProbe>,
    state: UpdaterState,
    activated: Arc<Notify>,
}

impl UpdateScheduler {
    pub fn new(
        config: StoreConfig,
        coordinator: Arc<InstallCoordinator>,
        checker: UpdateChecker,
        idle: Arc<dyn IdleProbe>,
    ) -> Self {
        Self {
            config,
            coordinator,
            checker,
            idle,
            state: UpdaterState::new(),
            activated: Arc::new(Notify::new()),
        }
    }

    pub fn state(&self) -> &UpdaterState {
        &self.state
    }

    /// Handle the host calls `notify_one` on when the application is activated.
    pub fn activation_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.activated)
    }

    pub async fn run<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        let mut timer = tokio::time::interval(self.config.scheduler.check_interval());
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let activated = Arc::clone(&self.activated);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = timer.tick() => {}
                _ = activated.notified() => debug!("activation triggered update check"),
            }

            if let Err(e) = self.tick(Instant::now()).await {
                warn!("update check failed: {}", e);
            }
        }
        debug!("update scheduler stopped");
    }

    pub async fn tick(&mut self, now: Instant) -> Result<TickOutcome> {
        let idle = self
            .idle
            .idle_state(self.config.scheduler.idle_threshold())
            .await;
        if idle != IdleState::Active {
            debug!("skipping update check, system is {:?}", idle);
            return Ok(TickOutcome::SkippedIdle(idle));
        }
        if !self.state.is_due(now, self.config.scheduler.min_interval()) {
            return Ok(TickOutcome::SkippedInterval);
        }
        self.state.last_check = Some(now);

        let candidates = self.updatable().await?;
        if candidates.is_empty() {
            return Ok(TickOutcome::Checked {
                updated: 0,
                failed: 0,
            });
        }

        let updates = self.checker.check_updates(&self.state, &candidates).await?;
        let (mut updated, mut failed) = (0, 0);
        for update in &updates {
            let Some(current) = candidates.iter().find(|c| c.id() == Some(&update.id)) else {
                continue;
            };
            match self.coordinator.install_update(current, update).await {
                Ok(_) => updated += 1,
                Err(e) => {
                    warn!("update of {} to {} failed: {}", update.id, update.version, e);
                    failed += 1;
                }
            }
        }

        info!("update check finished: {} updated, {} failed", updated, failed);
        Ok(TickOutcome::Checked { updated, failed })
    }

    /// Store installs that carry a key and point at a trusted update server.
    async fn updatable(&self) -> Result<Vec<InstalledExtension>> {
        let installed = installed_extensions_async(self.coordinator.root()).await?;
        Ok(installed
            .into_iter()
            .filter(|record| record.is_store() && record.manifest.key.is_some())
            .filter(|record| {
                record
                    .manifest
                    .update_url
                    .as_deref()
                    .is_some_and(|url| self.config.is_trusted_update_url(url))
            })
            .collect())
    }
}
