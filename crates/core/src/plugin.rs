//! Plugin (check definition) descriptors.
//!
//! Plugins are owned by the server and fetched through the REST layer;
//! monitors carry a denormalized copy in `PluginDetails`.

use serde::{Deserialize, Serialize};

/// Well-known plugin type tags.
pub const PLUGIN_TYPE_HTTP: &str = "http_monitor";
pub const PLUGIN_TYPE_SSL: &str = "SSLChecker";
pub const PLUGIN_TYPE_DATABASE: &str = "database-monitor";
pub const PLUGIN_TYPE_AGENT: &str = "AgentMonitor";

/// A check definition that can be attached to a monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorPlugin {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "Name", default)]
    pub name: String,
    #[serde(rename = "Description", default)]
    pub description: String,
    #[serde(rename = "pluginType", default)]
    pub plugin_type: String,
    /// Device type tags this plugin can run against.
    #[serde(rename = "compatibleDeviceTypes", default)]
    pub compatible_device_types: Vec<String>,
    #[serde(rename = "comingSoon", default, skip_serializing_if = "Option::is_none")]
    pub coming_soon: Option<bool>,
}

impl MonitorPlugin {
    /// Whether this plugin can be attached to a device of the given type.
    ///
    /// An empty compatibility list means "any device".
    pub fn supports_device(&self, device_type: &str) -> bool {
        self.compatible_device_types.is_empty()
            || self
                .compatible_device_types
                .iter()
                .any(|t| t.eq_ignore_ascii_case(device_type))
    }
}

/// Outcome of a single plugin run inside a monitoring result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginResult {
    pub plugin_id: String,
    #[serde(default)]
    pub plugin_name: String,
    #[serde(default)]
    pub plugin_description: String,
    #[serde(default)]
    pub plugin_type: String,
    #[serde(default)]
    pub status: crate::health::HealthStatus,
    #[serde(default)]
    pub output: String,
    #[serde(default)]
    pub metrics: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub checked_at: String,
}

/// A server-side check result for one monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitoringResult {
    pub id: String,
    pub system_monitor_id: String,
    #[serde(default)]
    pub status: crate::health::HealthStatus,
    #[serde(default)]
    pub checked_at: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub plugin_results: Vec<PluginResult>,
}
