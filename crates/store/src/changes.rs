//! Change feed for locally-originated group mutations.
//!
//! Only mutations made through the public group API are published here.
//! Remote write-through (`apply_remote_*`) is silent, which is what keeps
//! a broadcast from another client from being re-broadcast.

use serde_json::Value;
use vigil_core::message_types::{
    MSG_TYPE_GROUP_CREATED, MSG_TYPE_GROUP_DELETED, MSG_TYPE_GROUP_UPDATED,
};
use vigil_core::types::EntityId;
use vigil_core::MonitorGroup;

/// Broadcast channel capacity for group changes.
pub const CHANGE_FEED_CAPACITY: usize = 256;

/// A group mutation performed through this store.
#[derive(Debug, Clone, PartialEq)]
pub enum GroupChange {
    Created(MonitorGroup),
    Updated(MonitorGroup),
    Deleted(EntityId),
}

impl GroupChange {
    /// Wire message type used when relaying this change.
    pub fn message_type(&self) -> &'static str {
        match self {
            Self::Created(_) => MSG_TYPE_GROUP_CREATED,
            Self::Updated(_) => MSG_TYPE_GROUP_UPDATED,
            Self::Deleted(_) => MSG_TYPE_GROUP_DELETED,
        }
    }

    /// Id of the affected group.
    pub fn group_id(&self) -> &str {
        match self {
            Self::Created(g) | Self::Updated(g) => &g.id,
            Self::Deleted(id) => id,
        }
    }

    /// Outbound payload: the full record, or the bare id for deletions.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Self::Created(g) | Self::Updated(g) => serde_json::to_value(g),
            Self::Deleted(id) => Ok(Value::String(id.clone())),
        }
    }
}
