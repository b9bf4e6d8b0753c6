//! Domain types shared by the vigil monitoring console crates.
//!
//! Pure data and validation; no I/O.

pub mod error;
pub mod group;
pub mod health;
pub mod interval;
pub mod message_types;
pub mod monitor;
pub mod plugin;
pub mod types;

pub use error::CoreError;
pub use group::{MonitorGroup, NewMonitorGroup};
pub use health::HealthStatus;
pub use interval::CheckInterval;
pub use monitor::{DeviceKind, Monitor};
pub use plugin::{MonitorPlugin, MonitoringResult};
