//! Background refresh scheduling
//!
//! Spawns a task that re-fetches the inventory shortly before the current
//! entry's TTL expires, so consumers rarely observe a stale entry. Failed
//! refreshes are retried on a fixed backoff while the existing (possibly
//! past-due) entry keeps serving.
//!
//! The task talks to the rest of the subsystem only through
//! [`CacheCoordinator`]'s public operations; manual refreshes and
//! invalidations reschedule it through the coordinator's lifecycle
//! notifications.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::coordinator::CacheCoordinator;

/// Configuration for the background refresh task
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// How long before TTL expiry the proactive refresh fires
    pub refresh_lead: Duration,
    /// Delay before retrying after a failed refresh
    pub retry_backoff: Duration,
    /// Whether to refresh immediately on startup when no valid entry exists
    pub refresh_on_start: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            refresh_lead: Duration::from_secs(crate::config::DEFAULT_REFRESH_LEAD_SECS),
            retry_backoff: Duration::from_secs(crate::config::DEFAULT_RETRY_BACKOFF_SECS),
            refresh_on_start: true,
        }
    }
}

/// Scheduler states across an entry's lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SchedulerState {
    /// Waiting for the pre-expiry deadline of the current entry
    Idle,
    /// Last refresh failed; waiting out the backoff before retrying
    Retrying,
}

/// Handle for controlling the background refresh task
pub struct RefreshScheduler {
    /// Next scheduled fire time, shared with the task for reporting
    next_fire: Arc<RwLock<Option<DateTime<Utc>>>>,
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
}

impl RefreshScheduler {
    /// Spawns the background refresh task
    ///
    /// # Arguments
    /// * `coordinator` - The cache coordinator whose `refresh` the task drives
    /// * `config` - Lead time, retry backoff and startup behavior
    pub fn spawn(coordinator: CacheCoordinator, config: SchedulerConfig) -> Self {
        let next_fire = Arc::new(RwLock::new(None));
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task_next_fire = Arc::clone(&next_fire);
        tokio::spawn(async move {
            let mut state = SchedulerState::Idle;

            if config.refresh_on_start && !coordinator.is_valid() {
                state = match coordinator.refresh().await {
                    Ok(_) => SchedulerState::Idle,
                    Err(e) => {
                        warn!(error = %e, "startup refresh failed, will retry");
                        SchedulerState::Retrying
                    }
                };
            }

            loop {
                let deadline = match state {
                    SchedulerState::Idle => coordinator.expires_at().map(|expires| {
                        expires
                            - chrono::Duration::from_std(config.refresh_lead)
                                .unwrap_or_else(|_| chrono::Duration::zero())
                    }),
                    SchedulerState::Retrying => Some(
                        Utc::now()
                            + chrono::Duration::from_std(config.retry_backoff)
                                .unwrap_or_else(|_| chrono::Duration::zero()),
                    ),
                };
                set_next_fire(&task_next_fire, deadline);

                let when = match deadline {
                    Some(when) => when,
                    None => {
                        // No entry to schedule around; park until something
                        // changes or we shut down.
                        tokio::select! {
                            _ = coordinator.lifecycle_changed() => {
                                state = SchedulerState::Idle;
                                continue;
                            }
                            _ = shutdown_rx.recv() => break,
                        }
                    }
                };

                let sleep_for = (when - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::select! {
                    _ = tokio::time::sleep(sleep_for) => {
                        debug!("scheduled refresh firing");
                        state = match coordinator.refresh().await {
                            Ok(_) => SchedulerState::Idle,
                            Err(e) => {
                                warn!(error = %e, "scheduled refresh failed, backing off");
                                SchedulerState::Retrying
                            }
                        };
                    }
                    _ = coordinator.lifecycle_changed() => {
                        // Manual refresh or invalidation: drop the pending
                        // timer and recompute from current state.
                        state = SchedulerState::Idle;
                    }
                    _ = shutdown_rx.recv() => break,
                }
            }

            set_next_fire(&task_next_fire, None);
            debug!("refresh scheduler stopped");
        });

        Self {
            next_fire,
            shutdown_tx,
        }
    }

    /// Seconds until the next scheduled automatic refresh
    ///
    /// `None` while the scheduler has nothing to schedule around.
    /// Reporting only — never used for correctness decisions.
    pub fn remaining_seconds(&self) -> Option<u64> {
        let next = *self.next_fire.read().unwrap_or_else(|e| e.into_inner());
        next.map(|when| {
            when.signed_duration_since(Utc::now())
                .num_seconds()
                .max(0) as u64
        })
    }

    /// Shuts down the background task
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(()).await;
    }
}

fn set_next_fire(slot: &RwLock<Option<DateTime<Utc>>>, when: Option<DateTime<Utc>>) {
    *slot.write().unwrap_or_else(|e| e.into_inner()) = when;
}
