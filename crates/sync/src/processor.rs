//! Inbound message handling: store write-through and subscriber dispatch.
//!
//! The connection loop awaits [`MessageProcessor::handle_text`] for each
//! frame before reading the next one, so store writes happen in wire
//! order.

use std::sync::Arc;

use vigil_core::types::EntityId;
use vigil_core::{Monitor, MonitorGroup};
use vigil_store::LocalStore;

use crate::bootstrap::BootstrapState;
use crate::messages::{parse_frame, ChannelMessage, InboundFrame};
use crate::registry::SubscriberRegistry;

/// Applies inbound frames to the local store and fans them out.
pub struct MessageProcessor {
    store: Arc<LocalStore>,
    registry: Arc<SubscriberRegistry>,
    bootstrap: Arc<BootstrapState>,
    client_id: String,
}

impl MessageProcessor {
    /// `client_id` identifies this client's own relayed group mutations,
    /// which are ignored when they come back.
    pub fn new(
        store: Arc<LocalStore>,
        registry: Arc<SubscriberRegistry>,
        bootstrap: Arc<BootstrapState>,
        client_id: impl Into<String>,
    ) -> Self {
        Self {
            store,
            registry,
            bootstrap,
            client_id: client_id.into(),
        }
    }

    /// Handle one raw text frame. Malformed and unknown frames are logged
    /// and dropped.
    pub async fn handle_text(&self, text: &str) {
        match parse_frame(text) {
            Ok(InboundFrame::Snapshot(devices)) => self.handle_snapshot(devices).await,
            Ok(InboundFrame::Message(message)) => self.handle_message(message).await,
            Ok(InboundFrame::Unknown(message_type)) => {
                tracing::warn!(message_type = %message_type, "Ignoring unknown push message type");
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    raw = %truncate(text, 200),
                    "Failed to parse push message"
                );
            }
        }
    }

    /// Handle one parsed message.
    pub async fn handle_message(&self, message: ChannelMessage) {
        match &message {
            ChannelMessage::InitialDevices { data } => {
                self.handle_initial_devices(data).await;
            }
            ChannelMessage::InitialGroups { data } => {
                self.handle_initial_groups(data).await;
            }
            ChannelMessage::DeviceUpdate { data } => {
                self.handle_device_update(data).await;
                self.registry.dispatch(&message);
            }
            ChannelMessage::GroupCreated { data, origin }
            | ChannelMessage::GroupUpdated { data, origin } => {
                if self.is_echo(origin.as_deref()) {
                    tracing::trace!(group_id = %data.id, "Ignoring echo of own group change");
                    return;
                }
                if self.handle_remote_group(data).await {
                    self.registry.dispatch(&message);
                }
            }
            ChannelMessage::GroupDeleted { data, origin } => {
                if self.is_echo(origin.as_deref()) {
                    tracing::trace!(group_id = %data, "Ignoring echo of own group delete");
                    return;
                }
                self.handle_remote_group_delete(data).await;
                self.registry.dispatch(&message);
            }
            ChannelMessage::Heartbeat { .. }
            | ChannelMessage::Subscribe { .. }
            | ChannelMessage::Unsubscribe { .. } => {
                self.registry.dispatch(&message);
            }
        }
    }

    // ---- write-through ----

    /// A bare monitor list. Subscribers see it through their own store
    /// reads, so nothing is dispatched.
    async fn handle_snapshot(&self, devices: Vec<Monitor>) {
        tracing::debug!(count = devices.len(), "Received monitor snapshot");
        if let Err(e) = self.store.add_devices(&devices).await {
            tracing::error!(error = %e, "Failed to store monitor snapshot");
        }
    }

    async fn handle_initial_devices(&self, devices: &[Monitor]) {
        if let Err(e) = self.store.add_devices(devices).await {
            tracing::error!(error = %e, "Failed to store initial devices");
        }
        self.bootstrap.record_devices(devices.to_vec());
    }

    async fn handle_initial_groups(&self, groups: &[MonitorGroup]) {
        if let Err(e) = self.store.put_groups(groups).await {
            tracing::error!(error = %e, "Failed to store initial groups");
        }
        self.bootstrap.record_groups(groups.to_vec());
    }

    async fn handle_device_update(&self, device: &Monitor) {
        if let Err(e) = self.store.put_device(device).await {
            tracing::error!(
                monitor_id = %device.system_monitor_id,
                error = %e,
                "Failed to store device update"
            );
        }
    }

    /// Returns whether the store changed.
    async fn handle_remote_group(&self, group: &MonitorGroup) -> bool {
        match self.store.apply_remote_group(group).await {
            Ok(applied) => applied,
            Err(e) => {
                tracing::error!(group_id = %group.id, error = %e, "Failed to apply remote group");
                false
            }
        }
    }

    async fn handle_remote_group_delete(&self, id: &EntityId) {
        if let Err(e) = self.store.apply_remote_group_delete(id).await {
            tracing::error!(group_id = %id, error = %e, "Failed to apply remote group delete");
        }
    }

    fn is_echo(&self, origin: Option<&str>) -> bool {
        origin == Some(self.client_id.as_str())
    }
}

/// Shorten a raw frame for logging without splitting a character.
fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
