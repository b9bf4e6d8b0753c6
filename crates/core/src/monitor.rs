//! Monitor records (a monitored service or device).
//!
//! Field names follow the server's wire format (`SystemMonitorId`,
//! `IPAddress`, `checkInterval`, ...). Every field except the id has a
//! default so partial snapshots from older servers still deserialize.
//! Records are always replaced wholesale; there is no field-level merge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::health::HealthStatus;
use crate::interval::CheckInterval;
use crate::plugin::MonitorPlugin;
use crate::types::EntityId;

// ---------------------------------------------------------------------------
// Device kind
// ---------------------------------------------------------------------------

/// Type tag of the monitored entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum DeviceKind {
    #[default]
    Server,
    Network,
    Database,
    /// Any tag the console has no special handling for (e.g. `"switch"`).
    Other(String),
}

impl DeviceKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Server => "Server",
            Self::Network => "Network",
            Self::Database => "Database",
            Self::Other(tag) => tag,
        }
    }
}

impl From<String> for DeviceKind {
    fn from(s: String) -> Self {
        match s.as_str() {
            "Server" => Self::Server,
            "Network" => Self::Network,
            "Database" => Self::Database,
            _ => Self::Other(s),
        }
    }
}

impl From<DeviceKind> for String {
    fn from(kind: DeviceKind) -> Self {
        kind.as_str().to_string()
    }
}

// ---------------------------------------------------------------------------
// Nested records
// ---------------------------------------------------------------------------

/// Display hints for the current health status.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct HealthStatusInfo {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub color: String,
}

/// Lifecycle timestamps of a monitor.
///
/// Timestamps are kept as the server sent them; use the accessor methods
/// to get parsed values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MonitorMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub created_at: String,
    /// Accumulated downtime, e.g. `"0D 0H 0M 0S"`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub down_time: String,
    #[serde(default)]
    pub last_check_time: Option<String>,
    #[serde(default)]
    pub last_service_up_time: Option<String>,
    #[serde(default)]
    pub acknowledged_date_time: Option<String>,
    #[serde(default)]
    pub snooze_until: Option<String>,
}

impl MonitorMetadata {
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.created_at)
    }

    pub fn last_check_time(&self) -> Option<DateTime<Utc>> {
        self.last_check_time.as_deref().and_then(parse_timestamp)
    }

    pub fn last_service_up_time(&self) -> Option<DateTime<Utc>> {
        self.last_service_up_time.as_deref().and_then(parse_timestamp)
    }

    /// Whether alerts are snoozed at `now`.
    pub fn is_snoozed(&self, now: DateTime<Utc>) -> bool {
        self.snooze_until
            .as_deref()
            .and_then(parse_timestamp)
            .is_some_and(|until| until > now)
    }
}

/// Treat an explicit JSON `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Parse an RFC 3339 timestamp, also accepting the zone-less form some
/// servers emit (interpreted as UTC).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Some(ts.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

// ---------------------------------------------------------------------------
// Monitor
// ---------------------------------------------------------------------------

/// A monitored service/device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Monitor {
    #[serde(rename = "SystemMonitorId")]
    pub system_monitor_id: EntityId,
    #[serde(rename = "ServiceName", default, deserialize_with = "null_as_default")]
    pub service_name: String,
    #[serde(rename = "Description", default, deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(rename = "IPAddress", default, deserialize_with = "null_as_default")]
    pub ip_address: String,
    #[serde(rename = "Port", default, deserialize_with = "null_as_default")]
    pub port: u16,
    #[serde(rename = "Agent", default, deserialize_with = "null_as_default")]
    pub agent: String,
    #[serde(rename = "Device", default, deserialize_with = "null_as_default")]
    pub device: DeviceKind,
    #[serde(rename = "CurrentHealthCheck", default, deserialize_with = "null_as_default")]
    pub current_health_check: HealthStatus,
    #[serde(rename = "HealthStatusInfo", default, deserialize_with = "null_as_default")]
    pub health_status_info: HealthStatusInfo,
    #[serde(rename = "IsMonitored", default, deserialize_with = "null_as_default")]
    pub is_monitored: bool,
    #[serde(rename = "IsServiceIssueAcknowledged", default, deserialize_with = "null_as_default")]
    pub is_service_issue_acknowledged: bool,
    #[serde(rename = "checkInterval", default, deserialize_with = "null_as_default")]
    pub check_interval: CheckInterval,
    /// Plugin-specific configuration, serialized by the server.
    #[serde(rename = "Configuration", default, deserialize_with = "null_as_default")]
    pub configuration: String,
    /// Numeric samples, most recent last.
    #[serde(rename = "Metrics", default, deserialize_with = "null_as_default")]
    pub metrics: Vec<f64>,
    #[serde(rename = "Plugins", default, deserialize_with = "null_as_default")]
    pub plugins: Vec<String>,
    #[serde(rename = "PluginDetails", default, deserialize_with = "null_as_default")]
    pub plugin_details: Vec<MonitorPlugin>,
    #[serde(rename = "Metadata", default, deserialize_with = "null_as_default")]
    pub metadata: MonitorMetadata,
}

impl Monitor {
    /// A record with only the id set. Mostly useful for tests and seeding.
    pub fn new(system_monitor_id: impl Into<EntityId>) -> Self {
        Self {
            system_monitor_id: system_monitor_id.into(),
            service_name: String::new(),
            description: String::new(),
            ip_address: String::new(),
            port: 0,
            agent: String::new(),
            device: DeviceKind::default(),
            current_health_check: HealthStatus::default(),
            health_status_info: HealthStatusInfo::default(),
            is_monitored: false,
            is_service_issue_acknowledged: false,
            check_interval: CheckInterval::default(),
            configuration: String::new(),
            metrics: Vec::new(),
            plugins: Vec::new(),
            plugin_details: Vec::new(),
            metadata: MonitorMetadata::default(),
        }
    }

    pub fn id(&self) -> &str {
        &self.system_monitor_id
    }

    /// Most recent metric sample, if any.
    pub fn latest_metric(&self) -> Option<f64> {
        self.metrics.last().copied()
    }

    /// Resolve a plugin id against `PluginDetails`.
    ///
    /// Falls back to the first descriptor when the id has no match, which
    /// is how list views render monitors whose details are out of step
    /// with `Plugins`.
    pub fn plugin_detail(&self, plugin_id: &str) -> Option<&MonitorPlugin> {
        self.plugin_details
            .iter()
            .find(|p| p.id == plugin_id)
            .or_else(|| self.plugin_details.first())
    }

    /// Plugin ids in `Plugins` with no matching entry in `PluginDetails`.
    pub fn unresolved_plugins(&self) -> Vec<&str> {
        self.plugins
            .iter()
            .filter(|id| !self.plugin_details.iter().any(|p| &p.id == *id))
            .map(String::as_str)
            .collect()
    }
}
