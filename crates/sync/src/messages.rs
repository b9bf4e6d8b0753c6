//! Push-channel message types and parser.
//!
//! The server sends either a bare JSON array (a full monitor snapshot) or
//! an envelope discriminated by its `"type"` field. Envelopes deserialize
//! into the closed [`ChannelMessage`] enum; anything else is reported as
//! [`InboundFrame::Unknown`] so the caller can log and move on.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use vigil_core::message_types::{
    MSG_TYPE_DEVICE_UPDATE, MSG_TYPE_DEVICE_UPDATE_LEGACY, MSG_TYPE_GROUP_CREATED,
    MSG_TYPE_GROUP_DELETED, MSG_TYPE_GROUP_UPDATED, MSG_TYPE_HEARTBEAT, MSG_TYPE_INITIAL_DEVICES,
    MSG_TYPE_INITIAL_GROUPS, MSG_TYPE_SUBSCRIBE, MSG_TYPE_UNSUBSCRIBE,
};
use vigil_core::types::EntityId;
use vigil_core::{Monitor, MonitorGroup};

/// Legacy spelling of `groupUpdated` still sent by some servers.
const MSG_TYPE_GROUP_UPDATED_LEGACY: &str = "groupUpdate";

/// All known push-channel messages.
///
/// Payloads arrive under `data`; `message` is accepted as well since that
/// is the field clients use when they publish. `origin` carries the
/// publishing client's id when a message is a relayed client mutation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ChannelMessage {
    /// Full monitor snapshot delivered once after connect.
    #[serde(rename = "initialDevices")]
    InitialDevices {
        #[serde(alias = "message", deserialize_with = "records")]
        data: Vec<Monitor>,
    },

    /// Full group snapshot delivered once after connect.
    #[serde(rename = "initialGroups")]
    InitialGroups {
        #[serde(alias = "message", deserialize_with = "records")]
        data: Vec<MonitorGroup>,
    },

    /// A single monitor record, replacing the stored one.
    #[serde(rename = "deviceUpdate", alias = "device_update")]
    DeviceUpdate {
        #[serde(alias = "message")]
        data: Monitor,
    },

    #[serde(rename = "groupCreated")]
    GroupCreated {
        #[serde(alias = "message")]
        data: MonitorGroup,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },

    #[serde(rename = "groupUpdated", alias = "groupUpdate")]
    GroupUpdated {
        #[serde(alias = "message")]
        data: MonitorGroup,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },

    /// The payload is the deleted group's id (a bare string or `{"id": ...}`).
    #[serde(rename = "groupDeleted")]
    GroupDeleted {
        #[serde(alias = "message", deserialize_with = "group_id")]
        data: EntityId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        origin: Option<String>,
    },

    /// Liveness ping. `timestamp` is epoch milliseconds.
    #[serde(rename = "heartbeat")]
    Heartbeat {
        #[serde(default)]
        timestamp: Option<i64>,
    },

    #[serde(rename = "subscribe")]
    Subscribe {
        #[serde(default)]
        topics: Vec<String>,
    },

    #[serde(rename = "unsubscribe")]
    Unsubscribe {
        #[serde(default)]
        topics: Vec<String>,
    },
}

impl ChannelMessage {
    pub fn kind(&self) -> MessageKind {
        match self {
            Self::InitialDevices { .. } => MessageKind::InitialDevices,
            Self::InitialGroups { .. } => MessageKind::InitialGroups,
            Self::DeviceUpdate { .. } => MessageKind::DeviceUpdate,
            Self::GroupCreated { .. } => MessageKind::GroupCreated,
            Self::GroupUpdated { .. } => MessageKind::GroupUpdated,
            Self::GroupDeleted { .. } => MessageKind::GroupDeleted,
            Self::Heartbeat { .. } => MessageKind::Heartbeat,
            Self::Subscribe { .. } => MessageKind::Subscribe,
            Self::Unsubscribe { .. } => MessageKind::Unsubscribe,
        }
    }

    /// Publishing client id, for relayed group mutations.
    pub fn origin(&self) -> Option<&str> {
        match self {
            Self::GroupCreated { origin, .. }
            | Self::GroupUpdated { origin, .. }
            | Self::GroupDeleted { origin, .. } => origin.as_deref(),
            _ => None,
        }
    }
}

/// Discriminant of [`ChannelMessage`], used as the subscription key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {
    InitialDevices,
    InitialGroups,
    DeviceUpdate,
    GroupCreated,
    GroupUpdated,
    GroupDeleted,
    Heartbeat,
    Subscribe,
    Unsubscribe,
}

impl MessageKind {
    /// Canonical wire name.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InitialDevices => MSG_TYPE_INITIAL_DEVICES,
            Self::InitialGroups => MSG_TYPE_INITIAL_GROUPS,
            Self::DeviceUpdate => MSG_TYPE_DEVICE_UPDATE,
            Self::GroupCreated => MSG_TYPE_GROUP_CREATED,
            Self::GroupUpdated => MSG_TYPE_GROUP_UPDATED,
            Self::GroupDeleted => MSG_TYPE_GROUP_DELETED,
            Self::Heartbeat => MSG_TYPE_HEARTBEAT,
            Self::Subscribe => MSG_TYPE_SUBSCRIBE,
            Self::Unsubscribe => MSG_TYPE_UNSUBSCRIBE,
        }
    }

    /// Resolve a wire `type` value, including legacy spellings.
    pub fn from_type(message_type: &str) -> Option<Self> {
        Some(match message_type {
            MSG_TYPE_INITIAL_DEVICES => Self::InitialDevices,
            MSG_TYPE_INITIAL_GROUPS => Self::InitialGroups,
            MSG_TYPE_DEVICE_UPDATE | MSG_TYPE_DEVICE_UPDATE_LEGACY => Self::DeviceUpdate,
            MSG_TYPE_GROUP_CREATED => Self::GroupCreated,
            MSG_TYPE_GROUP_UPDATED | MSG_TYPE_GROUP_UPDATED_LEGACY => Self::GroupUpdated,
            MSG_TYPE_GROUP_DELETED => Self::GroupDeleted,
            MSG_TYPE_HEARTBEAT => Self::Heartbeat,
            MSG_TYPE_SUBSCRIBE => Self::Subscribe,
            MSG_TYPE_UNSUBSCRIBE => Self::Unsubscribe,
            _ => return None,
        })
    }

    /// Bootstrap snapshots are delivered through
    /// [`SyncChannel::initial_data`](crate::SyncChannel::initial_data), not
    /// through subscribers.
    pub fn is_bootstrap(self) -> bool {
        matches!(self, Self::InitialDevices | Self::InitialGroups)
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One parsed text frame.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundFrame {
    /// A bare array: the full monitor list.
    Snapshot(Vec<Monitor>),
    Message(ChannelMessage),
    /// An envelope whose `type` is missing or not recognised.
    Unknown(String),
}

/// Parse a raw text frame.
///
/// Fails only when the frame is not JSON or a known envelope has a
/// malformed payload.
pub fn parse_frame(text: &str) -> Result<InboundFrame, serde_json::Error> {
    let value: Value = serde_json::from_str(text)?;

    if value.is_array() {
        let values: Vec<Value> = serde_json::from_value(value)?;
        return Ok(InboundFrame::Snapshot(decode_records(values)));
    }

    let message_type = value.get("type").and_then(Value::as_str);
    match message_type.and_then(MessageKind::from_type) {
        Some(_) => Ok(InboundFrame::Message(serde_json::from_value(value)?)),
        None => Ok(InboundFrame::Unknown(
            message_type.unwrap_or_default().to_string(),
        )),
    }
}

/// Outbound envelope: `{"type", "message", "origin"}`.
#[derive(Debug, Serialize)]
pub struct OutboundEnvelope<'a, T: Serialize + ?Sized> {
    #[serde(rename = "type")]
    pub message_type: &'a str,
    pub message: &'a T,
    pub origin: &'a str,
}

/// Serialize an outbound message to a text frame.
pub fn encode_outbound<T: Serialize + ?Sized>(
    message_type: &str,
    message: &T,
    origin: &str,
) -> Result<String, serde_json::Error> {
    serde_json::to_string(&OutboundEnvelope {
        message_type,
        message,
        origin,
    })
}

/// Decode snapshot records one at a time, skipping the ones that fail.
fn decode_records<T: DeserializeOwned>(values: Vec<Value>) -> Vec<T> {
    let total = values.len();
    let records: Vec<T> = values
        .into_iter()
        .enumerate()
        .filter_map(|(index, value)| match serde_json::from_value(value) {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(index, error = %e, "Skipping malformed snapshot record");
                None
            }
        })
        .collect();
    if records.len() < total {
        tracing::warn!(kept = records.len(), total, "Snapshot decoded with skipped records");
    }
    records
}

fn records<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(decode_records(Vec::<Value>::deserialize(deserializer)?))
}

/// Accept a group id either bare or wrapped in a group-shaped object.
fn group_id<'de, D>(deserializer: D) -> Result<EntityId, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum GroupRef {
        Id(EntityId),
        Object { id: EntityId },
    }

    Ok(match GroupRef::deserialize(deserializer)? {
        GroupRef::Id(id) | GroupRef::Object { id } => id,
    })
}
