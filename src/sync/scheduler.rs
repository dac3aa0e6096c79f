//! # Sync Scheduler
//!
//! Owns the trigger policy for background synchronization:
//!
//! - **Startup**: a fixed short delay after process start, then a full sync
//!   if online
//! - **Periodic**: every sync interval while the app is foregrounded and
//!   online
//! - **Foreground edge**: a background-to-active transition triggers a sync
//!   if online
//! - **Reconnect edge**: restored connectivity drains the retry queue
//!   immediately, then runs a full sync after a short delay
//!
//! Triggers are fire-and-forget relative to the UI; failures funnel into
//! the retry queue inside the engine before they surface here, so a dropped
//! task result never loses a retry. Overlapping triggers are dropped by the
//! engine's in-flight guard rather than cancelled and restarted.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::sync::monitor::ConnectivityMonitor;
use crate::sync::SyncEngine;

/// App lifecycle transitions relevant to sync scheduling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppLifecycleEvent {
    /// The app moved from background to active
    Foregrounded,
    /// The app left the foreground
    Backgrounded,
}

/// Background trigger loop for one user's sync engine.
#[derive(Debug)]
pub struct SyncScheduler {
    engine: Arc<SyncEngine>,
    monitor: Arc<ConnectivityMonitor>,
    user_id: String,
    sync_interval: Duration,
    startup_delay: Duration,
    reconnect_delay: Duration,
    foreground: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl SyncScheduler {
    pub fn new(
        engine: Arc<SyncEngine>,
        monitor: Arc<ConnectivityMonitor>,
        config: &SyncConfig,
        user_id: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            monitor,
            user_id: user_id.into(),
            sync_interval: config.sync_interval,
            startup_delay: config.startup_delay,
            reconnect_delay: config.reconnect_delay,
            foreground: Arc::new(AtomicBool::new(true)),
            tasks: Vec::new(),
        }
    }

    /// Start the background trigger tasks.
    pub fn start(&mut self) {
        if !self.tasks.is_empty() {
            tracing::warn!("sync scheduler already running");
            return;
        }

        self.tasks.push(self.spawn_startup_task());
        self.tasks.push(self.spawn_periodic_task());
        self.tasks.push(self.spawn_reconnect_task());
    }

    /// Stop the background trigger tasks. An in-flight sync is not
    /// cancelled; only future triggers stop firing.
    pub fn stop(&mut self) {
        for task in self.tasks.drain(..) {
            task.abort();
        }
    }

    /// Feed an app lifecycle transition.
    pub fn handle_lifecycle(&self, event: AppLifecycleEvent) {
        match event {
            AppLifecycleEvent::Foregrounded => {
                self.foreground.store(true, Ordering::Relaxed);
                if self.monitor.is_online() {
                    let engine = Arc::clone(&self.engine);
                    let user_id = self.user_id.clone();
                    tokio::spawn(async move {
                        if let Err(err) = engine.perform_sync(&user_id).await {
                            tracing::warn!(user_id, error = %err, "foreground sync failed");
                        }
                    });
                }
            }
            AppLifecycleEvent::Backgrounded => {
                self.foreground.store(false, Ordering::Relaxed);
            }
        }
    }

    /// Whether the scheduler currently considers the app foregrounded.
    pub fn is_foregrounded(&self) -> bool {
        self.foreground.load(Ordering::Relaxed)
    }

    fn spawn_startup_task(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let monitor = Arc::clone(&self.monitor);
        let user_id = self.user_id.clone();
        let delay = self.startup_delay;

        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !monitor.is_online() {
                tracing::debug!(user_id, "skipping startup sync while offline");
                return;
            }
            if let Err(err) = engine.perform_sync(&user_id).await {
                tracing::warn!(user_id, error = %err, "startup sync failed");
            }
        })
    }

    fn spawn_periodic_task(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let monitor = Arc::clone(&self.monitor);
        let user_id = self.user_id.clone();
        let foreground = Arc::clone(&self.foreground);
        let interval = self.sync_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // The first tick completes immediately; startup is its own
            // trigger.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if !foreground.load(Ordering::Relaxed) || !monitor.is_online() {
                    continue;
                }
                if let Err(err) = engine.perform_sync(&user_id).await {
                    tracing::warn!(user_id, error = %err, "periodic sync failed");
                }
            }
        })
    }

    fn spawn_reconnect_task(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let mut changes = self.monitor.subscribe();
        let user_id = self.user_id.clone();
        let delay = self.reconnect_delay;

        tokio::spawn(async move {
            loop {
                if changes.changed().await.is_err() {
                    break;
                }
                if !*changes.borrow() {
                    continue;
                }

                tracing::info!(user_id, "connectivity restored, draining sync queue");
                if let Err(err) = engine.process_sync_queue(&user_id).await {
                    tracing::warn!(user_id, error = %err, "queue drain failed");
                }

                tokio::time::sleep(delay).await;
                if let Err(err) = engine.perform_sync(&user_id).await {
                    tracing::warn!(user_id, error = %err, "reconnect sync failed");
                }
            }
        })
    }
}

impl Drop for SyncScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}
