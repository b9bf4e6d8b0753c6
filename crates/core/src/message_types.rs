//! Push-channel message type discriminators.
//!
//! Used by the sync channel when parsing inbound envelopes and when
//! wrapping outbound messages.

/// Full monitor snapshot delivered once after connect.
pub const MSG_TYPE_INITIAL_DEVICES: &str = "initialDevices";

/// Full group snapshot delivered once after connect.
pub const MSG_TYPE_INITIAL_GROUPS: &str = "initialGroups";

/// Single monitor record replace.
pub const MSG_TYPE_DEVICE_UPDATE: &str = "deviceUpdate";

/// Legacy spelling of [`MSG_TYPE_DEVICE_UPDATE`].
pub const MSG_TYPE_DEVICE_UPDATE_LEGACY: &str = "device_update";

pub const MSG_TYPE_GROUP_CREATED: &str = "groupCreated";
pub const MSG_TYPE_GROUP_UPDATED: &str = "groupUpdated";
pub const MSG_TYPE_GROUP_DELETED: &str = "groupDeleted";

/// Liveness ping. Dispatched to subscribers, otherwise inert.
pub const MSG_TYPE_HEARTBEAT: &str = "heartbeat";

pub const MSG_TYPE_SUBSCRIBE: &str = "subscribe";
pub const MSG_TYPE_UNSUBSCRIBE: &str = "unsubscribe";
