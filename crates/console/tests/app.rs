//! Integration tests for console start-up helpers.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use vigil_console::app::{needing_attention, run_commands, seed_store, watch_connection};
use vigil_core::{HealthStatus, Monitor};
use vigil_remote::MonitorApi;
use vigil_store::{LocalStore, StoreConfig};
use vigil_sync::{ChannelConfig, ConnectionStatus, ReconnectConfig, SyncChannel};

const WAIT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn open_store() -> (TempDir, Arc<LocalStore>) {
    let dir = tempfile::tempdir().expect("tempdir should be created");
    let url = format!("sqlite://{}", dir.path().join("cache.db").display());
    let store = Arc::new(LocalStore::new(StoreConfig::new(url)));
    store.initialize().await.expect("store should initialise");
    (dir, store)
}

/// Answer one HTTP request with a JSON body.
async fn http_once(body: &'static str) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}/api", listener.local_addr().unwrap());
    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut buf = vec![0u8; 4096];
        let _ = socket.read(&mut buf).await.unwrap();
        let response = format!(
            "HTTP/1.1 200 OK\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
            body.len()
        );
        socket.write_all(response.as_bytes()).await.unwrap();
    });
    base_url
}

/// A push endpoint that completes the handshake, then closes every
/// connection after `hold`.
async fn flaky_push_server(hold: Duration) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(async move {
                if let Ok(mut ws) = tokio_tungstenite::accept_async(socket).await {
                    tokio::time::sleep(hold).await;
                    let _ = ws.close(None).await;
                }
            });
        }
    });
    url
}

// ---------------------------------------------------------------------------
// Test: seeding
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_store_is_seeded_from_rest() {
    let (_dir, store) = open_store().await;
    let base_url = http_once(r#"[{"SystemMonitorId":"m1"},{"SystemMonitorId":"m2"}]"#).await;

    let seeded = seed_store(&store, &MonitorApi::new(base_url)).await.unwrap();

    assert_eq!(seeded, 2);
    assert_eq!(store.device_count().await.unwrap(), 2);
}

#[tokio::test]
async fn populated_store_is_not_reseeded() {
    let (_dir, store) = open_store().await;
    store.add_devices(&[Monitor::new("m1")]).await.unwrap();

    // Nothing listens here; a request would fail.
    let api = MonitorApi::new("http://127.0.0.1:9/api");
    assert_eq!(seed_store(&store, &api).await.unwrap(), 0);
}

// ---------------------------------------------------------------------------
// Test: summary
// ---------------------------------------------------------------------------

#[test]
fn attention_list_is_in_rank_order() {
    let with_health = |id: &str, health| Monitor {
        current_health_check: health,
        ..Monitor::new(id)
    };
    let devices = vec![
        with_health("cfg", HealthStatus::InvalidConfiguration),
        with_health("ok", HealthStatus::Healthy),
        with_health("deg", HealthStatus::Degraded),
        with_health("esc", HealthStatus::Escalation),
    ];

    let ids: Vec<_> = needing_attention(&devices)
        .into_iter()
        .map(|d| d.system_monitor_id.as_str())
        .collect();
    assert_eq!(ids, vec!["esc", "deg", "cfg"]);
}

// ---------------------------------------------------------------------------
// Test: stale-data policy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn cached_monitors_are_wiped_when_connection_drops() {
    let (_dir, store) = open_store().await;
    store.add_devices(&[Monitor::new("m1")]).await.unwrap();
    let group_id = store
        .add_group(vigil_core::NewMonitorGroup::new("Edge"))
        .await
        .unwrap();

    let url = flaky_push_server(Duration::from_millis(100)).await;
    let config = ChannelConfig::new(url).with_reconnect(ReconnectConfig {
        delay: Duration::from_millis(50),
        ..Default::default()
    });
    let channel = SyncChannel::new(config, Arc::clone(&store));
    let watcher = tokio::spawn(watch_connection(Arc::clone(&channel), Arc::clone(&store), true));
    channel.connect();

    tokio::time::timeout(WAIT, async {
        while store.device_count().await.unwrap() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("monitors should be wiped after the connection drops");
    assert!(store.get_group(&group_id).await.unwrap().is_some());

    channel.close().await;
    tokio::time::timeout(WAIT, watcher)
        .await
        .expect("watcher should stop once the channel is closed")
        .unwrap();
    assert_eq!(channel.state().status, ConnectionStatus::Closed);
}

#[tokio::test]
async fn wipe_policy_can_be_disabled() {
    let (_dir, store) = open_store().await;
    store.add_devices(&[Monitor::new("m1")]).await.unwrap();

    let url = flaky_push_server(Duration::from_millis(50)).await;
    let config = ChannelConfig::new(url).with_reconnect(ReconnectConfig {
        delay: Duration::from_secs(60),
        ..Default::default()
    });
    let channel = SyncChannel::new(config, Arc::clone(&store));
    let watcher = tokio::spawn(watch_connection(Arc::clone(&channel), Arc::clone(&store), false));
    channel.connect();

    let mut rx = channel.watch_state();
    tokio::time::timeout(WAIT, rx.wait_for(|s| s.is_connected()))
        .await
        .expect("channel should connect")
        .unwrap();
    tokio::time::timeout(WAIT, rx.wait_for(|s| !s.is_connected()))
        .await
        .expect("server should drop the connection")
        .unwrap();
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(store.device_count().await.unwrap(), 1);

    channel.close().await;
    let _ = tokio::time::timeout(WAIT, watcher).await;
}

// ---------------------------------------------------------------------------
// Test: operator commands
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconnect_command_starts_a_connection() {
    let (_dir, store) = open_store().await;
    let url = flaky_push_server(Duration::from_secs(5)).await;
    let channel = SyncChannel::new(ChannelConfig::new(url), Arc::clone(&store));
    let (tx, rx) = mpsc::unbounded_channel();
    let commands = tokio::spawn(run_commands(Arc::clone(&channel), rx));

    tx.send("status".to_string()).unwrap();
    tx.send("  reconnect ".to_string()).unwrap();

    let mut state = channel.watch_state();
    tokio::time::timeout(WAIT, state.wait_for(|s| s.is_connected()))
        .await
        .expect("reconnect command should connect")
        .unwrap();

    drop(tx);
    tokio::time::timeout(WAIT, commands)
        .await
        .expect("command loop should end when its input closes")
        .unwrap();
    channel.close().await;
}
