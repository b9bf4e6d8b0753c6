//! Bootstrap snapshot tracking.
//!
//! After connect the server sends one `initialDevices` and one
//! `initialGroups` message. The channel counts as initialised once both
//! have arrived. The last snapshot of each kind is cached and handed to
//! every caller of `initial_data`, including callers that arrive late.

use std::time::Duration;

use tokio::sync::watch;
use vigil_core::{Monitor, MonitorGroup};

/// The bootstrap snapshot pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InitialData {
    pub devices: Vec<Monitor>,
    pub groups: Vec<MonitorGroup>,
}

/// No bootstrap snapshot arrived within the allowed time.
#[derive(Debug, thiserror::Error)]
#[error("Bootstrap data not received within {0:?}")]
pub struct BootstrapTimeout(pub Duration);

#[derive(Debug, Clone, Default)]
struct Progress {
    /// Snapshots received on the current connection.
    devices: Option<Vec<Monitor>>,
    groups: Option<Vec<MonitorGroup>>,
    /// Last pair completed on a single connection.
    complete: Option<InitialData>,
}

impl Progress {
    fn promote(&mut self) -> bool {
        match (&self.devices, &self.groups) {
            (Some(devices), Some(groups)) => {
                self.complete = Some(InitialData {
                    devices: devices.clone(),
                    groups: groups.clone(),
                });
                true
            }
            _ => false,
        }
    }
}

/// Shared bootstrap state for one channel.
pub struct BootstrapState {
    progress: watch::Sender<Progress>,
}

impl Default for BootstrapState {
    fn default() -> Self {
        Self::new()
    }
}

impl BootstrapState {
    pub fn new() -> Self {
        let (progress, _) = watch::channel(Progress::default());
        Self { progress }
    }

    /// Start collecting snapshots for a new connection.
    ///
    /// The previous complete pair stays cached until both snapshots of the
    /// new connection have arrived, so the two halves never come from
    /// different connections.
    pub fn begin_session(&self) {
        self.progress.send_modify(|p| {
            p.devices = None;
            p.groups = None;
        });
    }

    pub fn record_devices(&self, devices: Vec<Monitor>) {
        self.record(|p| p.devices = Some(devices));
    }

    pub fn record_groups(&self, groups: Vec<MonitorGroup>) {
        self.record(|p| p.groups = Some(groups));
    }

    /// Whether a complete snapshot pair has been received.
    pub fn is_initialized(&self) -> bool {
        self.progress.borrow().complete.is_some()
    }

    /// The cached snapshot, if complete.
    pub fn snapshot(&self) -> Option<InitialData> {
        self.progress.borrow().complete.clone()
    }

    /// Wait until both snapshots have been received.
    pub async fn wait(&self) -> InitialData {
        let mut rx = self.progress.subscribe();
        let data = match rx.wait_for(|p| p.complete.is_some()).await {
            Ok(progress) => progress.complete.clone().unwrap_or_default(),
            // The sender lives in `self`, so the channel cannot close
            // while we borrow it.
            Err(_) => InitialData::default(),
        };
        data
    }

    /// [`wait`](Self::wait) with an upper bound.
    pub async fn wait_timeout(&self, timeout: Duration) -> Result<InitialData, BootstrapTimeout> {
        tokio::time::timeout(timeout, self.wait())
            .await
            .map_err(|_| BootstrapTimeout(timeout))
    }

    fn record(&self, update: impl FnOnce(&mut Progress)) {
        let mut completed = None;
        self.progress.send_modify(|p| {
            update(p);
            if p.promote() {
                completed = p.complete.as_ref().map(|c| (c.devices.len(), c.groups.len()));
            }
        });
        if let Some((devices, groups)) = completed {
            tracing::info!(devices, groups, "Bootstrap snapshot complete");
        }
    }
}
