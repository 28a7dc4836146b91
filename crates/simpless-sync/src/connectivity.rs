//! # Connectivity Monitor
//!
//! Watches network reachability and reports every change.
//!
//! ## Probe Loop
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  start(callback)                                                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  probe() ──► callback(initial status)       ← always delivered once    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─── every poll_interval ───────────────────────────────────┐         │
//! │  │  probe()                                                  │         │
//! │  │    same as last?  ──► nothing                             │         │
//! │  │    changed?       ──► callback(new status), watch update  │         │
//! │  └───────────────────────────────────────────────────────────┘         │
//! │       │                                                                 │
//! │       ▼  shutdown() or every handle dropped                            │
//! │  loop exits                                                            │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! No debouncing: a flapping link produces one callback per flip. The
//! callback runs on the monitor task, so it should only enqueue work
//! (see `SyncControllerHandle::connectivity_changed`).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::SyncConfig;
use crate::error::SyncResult;

// =============================================================================
// Network Status
// =============================================================================

/// Whether the catalog host is currently reachable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkStatus {
    Online,
    Offline,
}

impl fmt::Display for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkStatus::Online => write!(f, "online"),
            NetworkStatus::Offline => write!(f, "offline"),
        }
    }
}

// =============================================================================
// Probes
// =============================================================================

/// A single reachability check.
#[async_trait]
pub trait ReachabilityProbe: Send + Sync {
    async fn probe(&self) -> NetworkStatus;
}

/// Reachability by opening (and immediately dropping) a TCP connection.
#[derive(Debug, Clone)]
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn new(host: impl Into<String>, port: u16, timeout: Duration) -> Self {
        TcpProbe {
            host: host.into(),
            port,
            timeout,
        }
    }

    /// Probe aimed at `[connectivity]` target, defaulting to the catalog host.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        let (host, port) = config.probe_target()?;
        Ok(Self::new(host, port, config.probe_timeout()))
    }
}

#[async_trait]
impl ReachabilityProbe for TcpProbe {
    async fn probe(&self) -> NetworkStatus {
        let connect = TcpStream::connect((self.host.as_str(), self.port));
        match tokio::time::timeout(self.timeout, connect).await {
            Ok(Ok(_stream)) => NetworkStatus::Online,
            Ok(Err(e)) => {
                debug!(host = %self.host, port = self.port, error = %e, "Probe failed");
                NetworkStatus::Offline
            }
            Err(_) => {
                debug!(host = %self.host, port = self.port, "Probe timed out");
                NetworkStatus::Offline
            }
        }
    }
}

// =============================================================================
// Monitor
// =============================================================================

/// Polls a [`ReachabilityProbe`] on its own task.
pub struct ConnectivityMonitor {
    probe: Arc<dyn ReachabilityProbe>,
    poll_interval: Duration,
}

/// Handle for a running monitor.
///
/// Dropping every clone stops the monitor.
#[derive(Clone)]
pub struct ConnectivityHandle {
    status_rx: watch::Receiver<Option<NetworkStatus>>,
    shutdown_tx: mpsc::Sender<()>,
}

impl ConnectivityHandle {
    /// Latest observed status; `None` until the first probe completes.
    pub fn status(&self) -> Option<NetworkStatus> {
        *self.status_rx.borrow()
    }

    /// Subscribes to status changes.
    pub fn subscribe(&self) -> watch::Receiver<Option<NetworkStatus>> {
        self.status_rx.clone()
    }

    /// Stops the probe loop. Idempotent.
    pub async fn shutdown(&self) {
        // a closed channel means the loop is already gone
        let _ = self.shutdown_tx.send(()).await;
    }
}

impl ConnectivityMonitor {
    pub fn new(probe: Arc<dyn ReachabilityProbe>, poll_interval: Duration) -> Self {
        ConnectivityMonitor {
            probe,
            poll_interval,
        }
    }

    /// Monitor with a [`TcpProbe`] and the configured poll interval.
    pub fn from_config(config: &SyncConfig) -> SyncResult<Self> {
        let probe = TcpProbe::from_config(config)?;
        Ok(Self::new(Arc::new(probe), config.poll_interval()))
    }

    /// Starts monitoring. `callback` receives the initial status, then one
    /// call per transition.
    pub fn start<F>(self, callback: F) -> ConnectivityHandle
    where
        F: Fn(NetworkStatus) + Send + Sync + 'static,
    {
        let (status_tx, status_rx) = watch::channel(None);
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        tokio::spawn(self.run(status_tx, shutdown_rx, callback));

        ConnectivityHandle {
            status_rx,
            shutdown_tx,
        }
    }

    async fn run<F>(
        self,
        status_tx: watch::Sender<Option<NetworkStatus>>,
        mut shutdown_rx: mpsc::Receiver<()>,
        callback: F,
    ) where
        F: Fn(NetworkStatus) + Send + Sync + 'static,
    {
        let mut last = self.probe.probe().await;
        info!(status = %last, "Connectivity monitor started");
        status_tx.send_replace(Some(last));
        callback(last);

        let mut ticker = interval_at(Instant::now() + self.poll_interval, self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown_rx.recv() => {
                    info!("Connectivity monitor shutting down");
                    break;
                }
                _ = ticker.tick() => {
                    let status = self.probe.probe().await;
                    if status == last {
                        continue;
                    }

                    match status {
                        NetworkStatus::Online => info!("Network: ONLINE"),
                        NetworkStatus::Offline => warn!("Network: OFFLINE"),
                    }
                    last = status;
                    status_tx.send_replace(Some(status));
                    callback(status);
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
