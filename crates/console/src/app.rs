//! Console start-up and run loop.

use std::io::BufRead;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use vigil_core::Monitor;
use vigil_remote::MonitorApi;
use vigil_store::LocalStore;
use vigil_sync::{ChannelMessage, ConnectionStatus, MessageKind, Subscription, SyncChannel};

use crate::config::ConsoleConfig;

/// How long to wait for the bootstrap snapshot before carrying on with
/// whatever the local cache holds.
const BOOTSTRAP_TIMEOUT: Duration = Duration::from_secs(30);

/// Run the console until Ctrl-C.
pub async fn run(config: ConsoleConfig) -> anyhow::Result<()> {
    let store = Arc::new(LocalStore::new(config.store_config()));
    store.initialize().await?;

    let api = MonitorApi::new(config.api_base_url.clone());
    match seed_store(&store, &api).await {
        Ok(0) => {}
        Ok(count) => tracing::info!(count, "Seeded local store from REST API"),
        Err(e) => tracing::warn!(error = %e, "Could not seed local store, continuing with cache"),
    }

    let channel = SyncChannel::new(config.channel_config(), Arc::clone(&store));
    let subscriptions = log_updates(&channel);
    let watcher = tokio::spawn(watch_connection(
        Arc::clone(&channel),
        Arc::clone(&store),
        config.wipe_on_disconnect,
    ));
    let commands = tokio::spawn(run_commands(Arc::clone(&channel), spawn_stdin_reader()));
    channel.connect();

    match channel.initial_data_timeout(BOOTSTRAP_TIMEOUT).await {
        Ok(data) => tracing::info!(
            devices = data.devices.len(),
            groups = data.groups.len(),
            "Bootstrap complete"
        ),
        Err(e) => tracing::warn!(error = %e, "Continuing without bootstrap snapshot"),
    }
    log_summary(&store).await;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");

    for subscription in subscriptions {
        subscription.unsubscribe();
    }
    commands.abort();
    channel.close().await;
    let _ = watcher.await;

    tracing::info!("Console shut down");
    Ok(())
}

/// Fill an empty store from the REST API.
///
/// Returns the number of monitors written; 0 when the store already had
/// data.
pub async fn seed_store(store: &LocalStore, api: &MonitorApi) -> anyhow::Result<usize> {
    if store.device_count().await? > 0 {
        return Ok(0);
    }
    let monitors = api.list_monitors().await?;
    store.add_devices(&monitors).await?;
    Ok(monitors.len())
}

/// Subscribe log lines for live monitor and group events.
pub fn log_updates(channel: &SyncChannel) -> Vec<Subscription> {
    let mut subscriptions = Vec::new();

    subscriptions.push(channel.subscribe(MessageKind::DeviceUpdate, |msg| {
        if let ChannelMessage::DeviceUpdate { data } = msg {
            tracing::info!(
                monitor_id = %data.system_monitor_id,
                service = %data.service_name,
                health = %data.current_health_check,
                "Monitor updated"
            );
        }
        Ok(())
    }));

    for kind in [
        MessageKind::GroupCreated,
        MessageKind::GroupUpdated,
        MessageKind::GroupDeleted,
    ] {
        subscriptions.push(channel.subscribe(kind, move |msg| {
            match msg {
                ChannelMessage::GroupCreated { data, .. } | ChannelMessage::GroupUpdated { data, .. } => {
                    tracing::info!(kind = %kind, group_id = %data.id, name = %data.name, "Group changed");
                }
                ChannelMessage::GroupDeleted { data, .. } => {
                    tracing::info!(group_id = %data, "Group deleted");
                }
                _ => {}
            }
            Ok(())
        }));
    }

    subscriptions.push(channel.subscribe(MessageKind::Heartbeat, |_| {
        tracing::trace!("Heartbeat");
        Ok(())
    }));

    subscriptions
}

/// Apply the stale-data policy on connection transitions.
///
/// When a live connection drops and `wipe_on_disconnect` is set, cached
/// monitors are cleared. Returns once the channel is closed.
pub async fn watch_connection(
    channel: Arc<SyncChannel>,
    store: Arc<LocalStore>,
    wipe_on_disconnect: bool,
) {
    let mut rx = channel.watch_state();
    let mut was_connected = rx.borrow().is_connected();

    while rx.changed().await.is_ok() {
        let state = *rx.borrow_and_update();
        match state.status {
            ConnectionStatus::Connected => {
                was_connected = true;
            }
            ConnectionStatus::Closed => return,
            ConnectionStatus::Exhausted => {
                tracing::warn!(
                    attempts = state.attempts,
                    "Push connection unavailable; type `reconnect` to try again"
                );
            }
            _ if was_connected => {
                was_connected = false;
                tracing::warn!("Push connection lost, cached data may be stale");
                if wipe_on_disconnect {
                    if let Err(e) = store.remove_devices().await {
                        tracing::error!(error = %e, "Failed to clear cached monitors");
                    }
                }
            }
            _ => {}
        }
    }
}

/// Forward stdin lines from a dedicated thread.
///
/// The thread is detached. A blocking read on it does not hold up runtime
/// shutdown the way `tokio::io::stdin` does.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("vigil-stdin".into())
        .spawn(move || {
            for line in std::io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        tracing::warn!(error = %e, "Could not start stdin reader, operator commands disabled");
    }
    rx
}

/// Apply operator commands until the line source closes.
pub async fn run_commands(channel: Arc<SyncChannel>, mut lines: mpsc::UnboundedReceiver<String>) {
    while let Some(line) = lines.recv().await {
        match line.trim() {
            "reconnect" => channel.reconnect(),
            "status" => tracing::info!(state = ?channel.state(), "Connection state"),
            "" => {}
            other => tracing::warn!(command = %other, "Unknown command (try `reconnect` or `status`)"),
        }
    }
}

/// Monitors whose status calls for attention, in list-view rank order.
pub fn needing_attention(devices: &[Monitor]) -> Vec<&Monitor> {
    let mut attention: Vec<_> = devices
        .iter()
        .filter(|d| d.current_health_check.needs_attention())
        .collect();
    attention.sort_by_key(|d| d.current_health_check.rank());
    attention
}

async fn log_summary(store: &LocalStore) {
    let devices = match store.get_all_devices().await {
        Ok(devices) => devices,
        Err(e) => {
            tracing::error!(error = %e, "Failed to read cached monitors");
            return;
        }
    };
    let groups = store.get_all_groups().await.map(|g| g.len()).unwrap_or(0);
    let attention = needing_attention(&devices);

    tracing::info!(
        monitors = devices.len(),
        groups,
        needs_attention = attention.len(),
        "Local cache summary"
    );
    for device in attention {
        tracing::warn!(
            monitor_id = %device.system_monitor_id,
            service = %device.service_name,
            health = %device.current_health_check,
            "Monitor needs attention"
        );
    }
}
