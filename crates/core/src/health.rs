//! Health status of a monitored service.
//!
//! The server reports `CurrentHealthCheck` as a free-form string. Parsing
//! is case-insensitive and anything unrecognised collapses to
//! [`HealthStatus::UnknownStatus`] so a new server-side status never
//! rejects an otherwise valid monitor record.

use serde::{Deserialize, Serialize};

/// Health of a monitor as last reported by its checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum HealthStatus {
    #[default]
    UnknownStatus,
    Healthy,
    Escalation,
    Acknowledged,
    Degraded,
    InvalidConfiguration,
    Scheduled,
}

/// All statuses in ranking order.
pub const ALL_STATUSES: &[HealthStatus] = &[
    HealthStatus::UnknownStatus,
    HealthStatus::Healthy,
    HealthStatus::Escalation,
    HealthStatus::Acknowledged,
    HealthStatus::Degraded,
    HealthStatus::InvalidConfiguration,
    HealthStatus::Scheduled,
];

impl HealthStatus {
    /// Wire name, e.g. `"InvalidConfiguration"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UnknownStatus => "UnknownStatus",
            Self::Healthy => "Healthy",
            Self::Escalation => "Escalation",
            Self::Acknowledged => "Acknowledged",
            Self::Degraded => "Degraded",
            Self::InvalidConfiguration => "InvalidConfiguration",
            Self::Scheduled => "Scheduled",
        }
    }

    /// Sort rank used by list views (lower sorts first).
    pub fn rank(&self) -> u8 {
        match self {
            Self::UnknownStatus => 0,
            Self::Healthy => 1,
            Self::Escalation => 2,
            Self::Acknowledged => 3,
            Self::Degraded => 4,
            Self::InvalidConfiguration => 5,
            Self::Scheduled => 6,
        }
    }

    /// Parse a status string, ignoring case. Unknown values map to
    /// [`HealthStatus::UnknownStatus`].
    pub fn parse(s: &str) -> Self {
        ALL_STATUSES
            .iter()
            .copied()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .unwrap_or_default()
    }

    /// Whether the status calls for operator attention.
    pub fn needs_attention(&self) -> bool {
        matches!(self, Self::Escalation | Self::Degraded | Self::InvalidConfiguration)
    }
}

impl From<String> for HealthStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<HealthStatus> for String {
    fn from(status: HealthStatus) -> Self {
        status.as_str().to_string()
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
