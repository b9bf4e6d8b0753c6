//! Check schedule descriptors.
//!
//! A monitor's `checkInterval` is either one of a handful of named presets
//! or a raw cron-like expression. Both travel as the bare expression
//! string; the preset is recovered by exact match.

use serde::{Deserialize, Serialize};

/// A named schedule preset offered by the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalPreset {
    pub label: &'static str,
    pub cron: &'static str,
}

/// Known presets, in the order the console offers them.
pub const INTERVAL_PRESETS: &[IntervalPreset] = &[
    IntervalPreset { label: "Every 30 seconds", cron: "*/30 * * * * *" },
    IntervalPreset { label: "Every minute", cron: "* * * * *" },
    IntervalPreset { label: "Every 5 minutes", cron: "*/5 * * * *" },
    IntervalPreset { label: "Every 15 minutes", cron: "*/15 * * * *" },
    IntervalPreset { label: "Every hour", cron: "0 * * * *" },
    IntervalPreset { label: "Twice daily (8AM & 6PM)", cron: "0 8,18 * * *" },
    IntervalPreset { label: "Daily at midnight", cron: "0 0 * * *" },
];

/// Schedule on which a monitor's checks run.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CheckInterval {
    /// No schedule configured (empty string on the wire).
    #[default]
    Unset,
    Preset(IntervalPreset),
    Custom(String),
}

impl CheckInterval {
    /// Resolve an expression to a preset when it matches one exactly.
    pub fn from_expression(expr: &str) -> Self {
        let expr = expr.trim();
        if expr.is_empty() {
            return Self::Unset;
        }
        match INTERVAL_PRESETS.iter().find(|p| p.cron == expr) {
            Some(preset) => Self::Preset(*preset),
            None => Self::Custom(expr.to_string()),
        }
    }

    /// The cron expression sent over the wire.
    pub fn expression(&self) -> &str {
        match self {
            Self::Unset => "",
            Self::Preset(preset) => preset.cron,
            Self::Custom(expr) => expr,
        }
    }

    /// Human-readable label, e.g. `"Every hour"` or `"Custom: 0 3 * * 1"`.
    pub fn label(&self) -> String {
        match self {
            Self::Unset => "Not scheduled".to_string(),
            Self::Preset(preset) => preset.label.to_string(),
            Self::Custom(expr) => format!("Custom: {expr}"),
        }
    }
}

impl From<String> for CheckInterval {
    fn from(s: String) -> Self {
        Self::from_expression(&s)
    }
}

impl From<CheckInterval> for String {
    fn from(interval: CheckInterval) -> Self {
        interval.expression().to_string()
    }
}
