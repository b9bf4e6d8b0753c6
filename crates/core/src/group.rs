//! Monitor groups: named, user-defined collections of monitor ids.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{EntityId, Timestamp};

/// Maximum length of a group name.
pub const MAX_GROUP_NAME_LEN: usize = 50;

/// Maximum length of a group description.
pub const MAX_GROUP_DESCRIPTION_LEN: usize = 200;

/// A stored monitor group.
///
/// `created_at` is fixed at creation; `updated_at` is refreshed on every
/// mutation and doubles as the version used to drop stale remote updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorGroup {
    pub id: EntityId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Member monitor ids. May contain duplicates; see
    /// [`unique_device_ids`](Self::unique_device_ids).
    #[serde(default)]
    pub device_ids: Vec<EntityId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl MonitorGroup {
    /// Member ids with duplicates removed, first occurrence wins.
    pub fn unique_device_ids(&self) -> Vec<EntityId> {
        let mut seen = std::collections::HashSet::new();
        self.device_ids
            .iter()
            .filter(|id| seen.insert(*id))
            .cloned()
            .collect()
    }

    /// Whether this record is strictly newer than `other`.
    pub fn is_newer_than(&self, other: &MonitorGroup) -> bool {
        self.updated_at > other.updated_at
    }
}

/// Input for creating a group. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMonitorGroup {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub device_ids: Vec<EntityId>,
}

impl NewMonitorGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_devices<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<EntityId>,
    {
        self.device_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate a group name: required, at most [`MAX_GROUP_NAME_LEN`] characters.
pub fn validate_group_name(name: &str) -> Result<(), CoreError> {
    let len = name.trim().chars().count();
    if len == 0 {
        return Err(CoreError::Validation("Group name is required".to_string()));
    }
    if len > MAX_GROUP_NAME_LEN {
        return Err(CoreError::Validation(format!(
            "Group name must be at most {MAX_GROUP_NAME_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Validate an optional group description.
pub fn validate_group_description(description: Option<&str>) -> Result<(), CoreError> {
    let len = description.map(|d| d.chars().count()).unwrap_or(0);
    if len > MAX_GROUP_DESCRIPTION_LEN {
        return Err(CoreError::Validation(format!(
            "Group description must be at most {MAX_GROUP_DESCRIPTION_LEN} characters, got {len}"
        )));
    }
    Ok(())
}

/// Validate the user-editable fields shared by create and update.
pub fn validate_group_fields(name: &str, description: Option<&str>) -> Result<(), CoreError> {
    validate_group_name(name)?;
    validate_group_description(description)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn group(ids: &[&str]) -> MonitorGroup {
        let now = Utc::now();
        MonitorGroup {
            id: "g1".into(),
            name: "Edge".into(),
            description: None,
            device_ids: ids.iter().map(|s| s.to_string()).collect(),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn unique_device_ids_keeps_first_occurrence() {
        let g = group(&["b", "a", "b", "c", "a"]);
        assert_eq!(g.unique_device_ids(), vec!["b", "a", "c"]);
    }

    #[test]
    fn newer_compares_updated_at() {
        let older = group(&[]);
        let mut newer = older.clone();
        newer.updated_at = older.updated_at + Duration::seconds(1);
        assert!(newer.is_newer_than(&older));
        assert!(!older.is_newer_than(&newer));
        assert!(!older.is_newer_than(&older.clone()));
    }

    #[test]
    fn name_rules() {
        assert!(validate_group_name("Core routers").is_ok());
        assert!(validate_group_name("   ").is_err());
        assert!(validate_group_name(&"x".repeat(MAX_GROUP_NAME_LEN)).is_ok());
        assert!(validate_group_name(&"x".repeat(MAX_GROUP_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn description_rules() {
        assert!(validate_group_description(None).is_ok());
        assert!(validate_group_description(Some("d".repeat(200).as_str())).is_ok());
        assert!(validate_group_description(Some("d".repeat(201).as_str())).is_err());
    }

    #[test]
    fn wire_format_is_camel_case() {
        let value = serde_json::to_value(group(&["m1"])).unwrap();
        assert_eq!(value["deviceIds"][0], "m1");
        assert!(value.get("createdAt").is_some());
        assert!(value.get("description").is_none());
    }
}
