//! # Connectivity Monitor
//!
//! Best-effort online/offline signal gating the scheduler's network
//! attempts.
//!
//! ## Features
//!
//! - **Passive signal**: the platform reports reachability transitions via
//!   [`ConnectivityMonitor::set_reachable`]
//! - **Active probe**: a lightweight authenticated round-trip to the remote
//!   store, on a periodic interval and on every passive transition
//! - **Conservative classification**: only errors that look like the network
//!   itself is down flip the status to offline; an auth failure or server
//!   rejection means the network is fine
//! - **Edge notifications**: a `watch` channel for restored-connectivity
//!   triggers

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::remote::RemoteStore;

/// Online/offline tracker. Starts offline until the first probe or passive
/// signal says otherwise.
#[derive(Debug)]
pub struct ConnectivityMonitor {
    online: Arc<AtomicBool>,
    changes: Arc<watch::Sender<bool>>,
    remote: Arc<RemoteStore>,
    probe_interval: Duration,
    probe_task: Mutex<Option<JoinHandle<()>>>,
}

impl ConnectivityMonitor {
    pub fn new(remote: Arc<RemoteStore>, probe_interval: Duration) -> Arc<Self> {
        let (changes, _) = watch::channel(false);
        Arc::new(Self {
            online: Arc::new(AtomicBool::new(false)),
            changes: Arc::new(changes),
            remote,
            probe_interval,
            probe_task: Mutex::new(None),
        })
    }

    /// Current best-effort status.
    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Subscribe to status transitions. Only actual changes are notified.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.changes.subscribe()
    }

    /// Feed a passive platform reachability signal.
    ///
    /// The status flips immediately and an active probe is spawned to
    /// confirm it.
    pub fn set_reachable(&self, reachable: bool) {
        update(&self.online, &self.changes, reachable);

        let remote = Arc::clone(&self.remote);
        let online = Arc::clone(&self.online);
        let changes = Arc::clone(&self.changes);
        tokio::spawn(async move {
            probe_and_update(&remote, &online, &changes).await;
        });
    }

    /// Run one active probe and fold the result into the status.
    pub async fn probe_once(&self) {
        probe_and_update(&self.remote, &self.online, &self.changes).await;
    }

    /// Start the periodic probe loop.
    pub fn start(&self) {
        let mut task = self
            .probe_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if task.is_some() {
            tracing::warn!("connectivity monitor already running");
            return;
        }

        let remote = Arc::clone(&self.remote);
        let online = Arc::clone(&self.online);
        let changes = Arc::clone(&self.changes);
        let interval = self.probe_interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                probe_and_update(&remote, &online, &changes).await;
            }
        }));
    }

    /// Stop the periodic probe loop.
    pub fn stop(&self) {
        if let Some(task) = self
            .probe_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            task.abort();
        }
    }
}

impl Drop for ConnectivityMonitor {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn probe_and_update(
    remote: &RemoteStore,
    online: &AtomicBool,
    changes: &watch::Sender<bool>,
) {
    match remote.probe().await {
        Ok(()) => update(online, changes, true),
        Err(err) if err.is_connectivity_loss() => {
            tracing::debug!(error = %err, "probe failed, marking offline");
            update(online, changes, false);
        }
        Err(err) => {
            // The request reached a server that answered; whatever it
            // answered, the network is up.
            tracing::debug!(error = %err, "probe got an application error, network is fine");
            update(online, changes, true);
        }
    }
}

fn update(online: &AtomicBool, changes: &watch::Sender<bool>, value: bool) {
    let was = online.swap(value, Ordering::SeqCst);
    if was != value {
        tracing::info!(online = value, "connectivity status changed");
        let _ = changes.send(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SyncConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn monitor_for(url: &str) -> Arc<ConnectivityMonitor> {
        let config = SyncConfig::builder()
            .server_url(url.to_string())
            .token("t".to_string())
            .build()
            .unwrap();
        ConnectivityMonitor::new(
            Arc::new(RemoteStore::new(Arc::new(config))),
            Duration::from_secs(30),
        )
    }

    #[tokio::test]
    async fn test_starts_offline() {
        let monitor = monitor_for("http://127.0.0.1:1");
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_successful_probe_marks_online() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let monitor = monitor_for(&server.uri());
        monitor.probe_once().await;
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_auth_failure_does_not_mark_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let monitor = monitor_for(&server.uri());
        monitor.probe_once().await;
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_unreachable_host_marks_offline() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let monitor = monitor_for(&server.uri());
        monitor.probe_once().await;
        assert!(monitor.is_online());

        // Same monitor, server gone: connection refused is a connectivity
        // loss.
        drop(server);
        monitor.probe_once().await;
        assert!(!monitor.is_online());
    }

    #[tokio::test]
    async fn test_passive_signal_flips_immediately() {
        let monitor = monitor_for("http://127.0.0.1:1");
        monitor.set_reachable(true);
        assert!(monitor.is_online());
    }

    #[tokio::test]
    async fn test_watch_notifies_on_transition() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/ping"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let monitor = monitor_for(&server.uri());
        let mut changes = monitor.subscribe();

        monitor.probe_once().await;
        changes.changed().await.unwrap();
        assert!(*changes.borrow());
    }
}
