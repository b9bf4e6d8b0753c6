//! The live sync channel.
//!
//! [`SyncChannel`] owns the single push connection of a client. It runs
//! one background task (connect -> process -> bounded reconnect), writes
//! inbound state through to the [`LocalStore`], fans messages out to
//! subscribers, and relays the store's group changes to the server.
//!
//! Connection state is published on a [`tokio::sync::watch`] channel so
//! observers see every open/close transition as it happens.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use vigil_store::LocalStore;

use crate::bootstrap::{BootstrapState, BootstrapTimeout, InitialData};
use crate::client::{self, TransportError, WsStream};
use crate::config::ChannelConfig;
use crate::messages::{encode_outbound, ChannelMessage, MessageKind};
use crate::processor::MessageProcessor;
use crate::reconnect::ReconnectState;
use crate::registry::{SubscriberRegistry, Subscription};
use crate::relay::relay_group_changes;

/// How long [`SyncChannel::close`] waits for the connection task.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Connection state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// Never connected, or the last connection dropped.
    Disconnected,
    /// First attempt of a connection task in progress.
    Connecting,
    Connected,
    /// Waiting for, or running, automatic retry number `attempt`.
    Reconnecting { attempt: u32 },
    /// Automatic retries used up; only a manual reconnect helps.
    Exhausted,
    /// Closed by the owner. Terminal.
    Closed,
}

/// Snapshot of the channel's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionState {
    pub status: ConnectionStatus,
    /// Automatic retries since the last successful open.
    pub attempts: u32,
}

impl ConnectionState {
    pub fn is_connected(&self) -> bool {
        self.status == ConnectionStatus::Connected
    }
}

impl Default for ConnectionState {
    fn default() -> Self {
        Self {
            status: ConnectionStatus::Disconnected,
            attempts: 0,
        }
    }
}

// ---------------------------------------------------------------------------
// Channel
// ---------------------------------------------------------------------------

/// The single push connection of a client.
///
/// Construct once at start-up with [`SyncChannel::new`] and share the
/// returned `Arc`.
pub struct SyncChannel {
    config: ChannelConfig,
    client_id: String,
    registry: Arc<SubscriberRegistry>,
    bootstrap: Arc<BootstrapState>,
    processor: MessageProcessor,
    store: Arc<LocalStore>,
    state: watch::Sender<ConnectionState>,
    /// Frame queue of the open session. `None` while disconnected.
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    relay: Mutex<Option<JoinHandle<()>>>,
    /// Master cancellation token, cancelled by [`close`](Self::close).
    cancel: CancellationToken,
}

impl SyncChannel {
    pub fn new(config: ChannelConfig, store: Arc<LocalStore>) -> Arc<Self> {
        let client_id = uuid::Uuid::new_v4().to_string();
        let registry = SubscriberRegistry::new();
        let bootstrap = Arc::new(BootstrapState::new());
        let processor = MessageProcessor::new(
            Arc::clone(&store),
            Arc::clone(&registry),
            Arc::clone(&bootstrap),
            client_id.clone(),
        );
        let (state, _) = watch::channel(ConnectionState::default());

        Arc::new(Self {
            config,
            client_id,
            registry,
            bootstrap,
            processor,
            store,
            state,
            outbound: Mutex::new(None),
            task: Mutex::new(None),
            relay: Mutex::new(None),
            cancel: CancellationToken::new(),
        })
    }

    /// Origin tag attached to every outbound message.
    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    /// Start the connection task.
    ///
    /// Idempotent: does nothing while a task is already running. Must be
    /// called from within a Tokio runtime.
    pub fn connect(self: &Arc<Self>) {
        if self.cancel.is_cancelled() {
            tracing::warn!("Channel is closed, ignoring connect");
            return;
        }

        let mut task = lock(&self.task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            tracing::debug!("Connection task already running");
            return;
        }

        self.ensure_relay();

        let channel = Arc::clone(self);
        *task = Some(tokio::spawn(async move {
            tracing::info!(url = %channel.config.url, "Starting connection task");
            channel.run_connection_loop().await;
            tracing::info!("Connection task exited");
        }));
    }

    /// Manually reconnect after the retry budget ran out.
    ///
    /// Starts a fresh task with a full retry budget. A no-op while a task
    /// is still running.
    pub fn reconnect(self: &Arc<Self>) {
        tracing::info!(state = ?self.state(), "Manual reconnect requested");
        self.connect();
    }

    /// Close the connection and stop reconnecting. Terminal.
    ///
    /// Cancels any pending reconnect delay and waits up to 5 seconds for
    /// the task to exit.
    pub async fn close(&self) {
        tracing::info!("Closing sync channel");
        self.cancel.cancel();

        let task = lock(&self.task).take();
        if let Some(handle) = task {
            let _ = tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await;
        }
        let relay = lock(&self.relay).take();
        if let Some(handle) = relay {
            handle.abort();
        }

        *lock(&self.outbound) = None;
        self.set_state(ConnectionStatus::Closed, 0);
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// Observe connection state transitions.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Send `{"type", "message", "origin"}` to the server.
    ///
    /// Only works while connected. Otherwise the message is dropped with a
    /// warning and `false` is returned; nothing is queued for later.
    pub fn send<T: Serialize + ?Sized>(&self, message_type: &str, message: &T) -> bool {
        let outbound = lock(&self.outbound);
        let Some(tx) = outbound.as_ref() else {
            tracing::warn!(message_type, "Not connected, dropping outbound message");
            return false;
        };

        let text = match encode_outbound(message_type, message, &self.client_id) {
            Ok(text) => text,
            Err(e) => {
                tracing::error!(message_type, error = %e, "Failed to encode outbound message");
                return false;
            }
        };

        if tx.send(text).is_err() {
            tracing::warn!(message_type, "Session ended, dropping outbound message");
            return false;
        }
        true
    }

    /// Register a callback for inbound messages of `kind`.
    ///
    /// Bootstrap kinds are never dispatched; use
    /// [`initial_data`](Self::initial_data) for those.
    pub fn subscribe<F>(&self, kind: MessageKind, callback: F) -> Subscription
    where
        F: Fn(&ChannelMessage) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        if kind.is_bootstrap() {
            tracing::warn!(kind = %kind, "Bootstrap messages are not dispatched to subscribers");
        }
        self.registry.subscribe(kind, callback)
    }

    /// Wait for both bootstrap snapshots. Returns the cached snapshot
    /// immediately once the channel has been initialised.
    pub async fn initial_data(&self) -> InitialData {
        self.bootstrap.wait().await
    }

    /// [`initial_data`](Self::initial_data) with a deadline.
    pub async fn initial_data_timeout(
        &self,
        timeout: Duration,
    ) -> Result<InitialData, BootstrapTimeout> {
        self.bootstrap.wait_timeout(timeout).await
    }

    /// Whether both bootstrap snapshots have arrived.
    pub fn is_initialized(&self) -> bool {
        self.bootstrap.is_initialized()
    }

    // ---- private helpers ----

    /// Connect -> process -> reconnect, until cancelled or exhausted.
    async fn run_connection_loop(self: Arc<Self>) {
        let mut reconnect = ReconnectState::new();
        self.set_state(ConnectionStatus::Connecting, 0);

        loop {
            let result = tokio::select! {
                _ = self.cancel.cancelled() => return,
                result = client::connect(&self.config.url) => result,
            };

            match result {
                Ok(ws_stream) => {
                    reconnect.on_open();
                    let outcome = self.run_session(ws_stream).await;
                    if self.cancel.is_cancelled() {
                        return;
                    }
                    self.set_state(ConnectionStatus::Disconnected, 0);
                    match outcome {
                        Ok(()) => tracing::info!("Push connection closed"),
                        Err(e) => tracing::warn!(error = %e, "Push connection lost"),
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, attempts = reconnect.attempts(), "Connect failed");
                    self.set_state(ConnectionStatus::Disconnected, reconnect.attempts());
                }
            }

            let Some(delay) = reconnect.on_closed(&self.config.reconnect) else {
                tracing::error!(
                    max_attempts = self.config.reconnect.max_attempts,
                    "Reconnect attempts exhausted, waiting for manual reconnect"
                );
                self.set_state(ConnectionStatus::Exhausted, reconnect.attempts());
                return;
            };

            let attempt = reconnect.attempts();
            self.set_state(ConnectionStatus::Reconnecting { attempt }, attempt);
            tracing::info!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to push endpoint"
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    /// Drive one open connection until it closes or the channel is
    /// cancelled.
    async fn run_session(&self, ws_stream: WsStream) -> Result<(), TransportError> {
        let (mut sink, mut stream) = ws_stream.split();
        let (tx, mut rx) = mpsc::unbounded_channel::<String>();
        *lock(&self.outbound) = Some(tx);
        self.bootstrap.begin_session();
        self.set_state(ConnectionStatus::Connected, 0);

        let result = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    let _ = sink.send(Message::Close(None)).await;
                    break Ok(());
                }
                Some(text) = rx.recv() => {
                    if let Err(e) = sink.send(Message::Text(text)).await {
                        break Err(TransportError::Protocol(format!("Send failed: {e}")));
                    }
                }
                msg = stream.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.processor.handle_text(&text).await;
                        }
                        Some(Ok(Message::Binary(_))) => {
                            tracing::trace!("Ignoring binary frame");
                        }
                        Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                            // Handled automatically by tungstenite.
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(?frame, "Server closed push connection");
                            break Ok(());
                        }
                        Some(Ok(Message::Frame(_))) => {}
                        Some(Err(e)) => {
                            break Err(TransportError::Protocol(e.to_string()));
                        }
                        None => break Ok(()),
                    }
                }
            }
        };

        *lock(&self.outbound) = None;
        result
    }

    /// Start relaying the store's group changes, once per channel.
    fn ensure_relay(self: &Arc<Self>) {
        let mut relay = lock(&self.relay);
        if relay.is_some() {
            return;
        }
        *relay = Some(tokio::spawn(relay_group_changes(
            Arc::downgrade(self),
            self.store.changes(),
            self.cancel.child_token(),
        )));
    }

    fn set_state(&self, status: ConnectionStatus, attempts: u32) {
        let next = ConnectionState { status, attempts };
        // A closed channel stays closed.
        self.state.send_if_modified(|current| {
            if current.status == ConnectionStatus::Closed || *current == next {
                return false;
            }
            tracing::debug!(from = ?current.status, to = ?status, "Connection state changed");
            *current = next;
            true
        });
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
