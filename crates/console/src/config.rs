//! Console configuration loaded from environment variables.

use std::time::Duration;

use vigil_store::StoreConfig;
use vigil_sync::{Backoff, ChannelConfig, ReconnectConfig};

/// Default local store location.
pub const DEFAULT_STORE_URL: &str = "sqlite://vigil-cache.db";

/// Upper bound on the exponential reconnect delay.
const EXPONENTIAL_MAX_DELAY: Duration = Duration::from_secs(60);

/// A malformed environment value.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{name} has invalid value {value:?}: {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Everything the console needs at start-up.
#[derive(Debug, Clone)]
pub struct ConsoleConfig {
    pub ws_url: String,
    pub api_base_url: String,
    /// `None` runs without a persistent cache.
    pub store_url: Option<String>,
    pub reconnect: ReconnectConfig,
    /// Clear cached monitors when the push connection drops.
    pub wipe_on_disconnect: bool,
}

impl ConsoleConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default                     |
    /// |--------------------------------|-----------------------------|
    /// | `VIGIL_WS_URL`                 | required                    |
    /// | `VIGIL_API_BASE_URL`           | `http://localhost:5000/api` |
    /// | `VIGIL_STORE_URL`              | `sqlite://vigil-cache.db`   |
    /// | `VIGIL_RECONNECT_MAX_ATTEMPTS` | `5`                         |
    /// | `VIGIL_RECONNECT_DELAY_MS`     | `3000`                      |
    /// | `VIGIL_RECONNECT_BACKOFF`      | `fixed`                     |
    /// | `VIGIL_WIPE_ON_DISCONNECT`     | `true`                      |
    ///
    /// An empty `VIGIL_STORE_URL` disables the local cache.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ws_url = lookup("VIGIL_WS_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or(ConfigError::Missing("VIGIL_WS_URL"))?;

        let api_base_url = lookup("VIGIL_API_BASE_URL")
            .unwrap_or_else(|| vigil_remote::DEFAULT_BASE_URL.to_string());

        let store_url = match lookup("VIGIL_STORE_URL") {
            Some(v) if v.trim().is_empty() => None,
            Some(v) => Some(v),
            None => Some(DEFAULT_STORE_URL.to_string()),
        };

        let defaults = ReconnectConfig::default();
        let max_attempts = parse_or(&lookup, "VIGIL_RECONNECT_MAX_ATTEMPTS", defaults.max_attempts)?;
        let delay_ms = parse_or(
            &lookup,
            "VIGIL_RECONNECT_DELAY_MS",
            defaults.delay.as_millis() as u64,
        )?;
        let backoff = match lookup("VIGIL_RECONNECT_BACKOFF").as_deref().map(str::trim) {
            None | Some("") | Some("fixed") => Backoff::Fixed,
            Some("exponential") => Backoff::Exponential {
                multiplier: 2.0,
                max_delay: EXPONENTIAL_MAX_DELAY,
            },
            Some(other) => {
                return Err(ConfigError::Invalid {
                    name: "VIGIL_RECONNECT_BACKOFF",
                    value: other.to_string(),
                    reason: "expected `fixed` or `exponential`".to_string(),
                })
            }
        };

        let wipe_on_disconnect = parse_or(&lookup, "VIGIL_WIPE_ON_DISCONNECT", true)?;

        Ok(Self {
            ws_url,
            api_base_url,
            store_url,
            reconnect: ReconnectConfig {
                max_attempts,
                delay: Duration::from_millis(delay_ms),
                backoff,
            },
            wipe_on_disconnect,
        })
    }

    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            database_url: self.store_url.clone(),
        }
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig::new(self.ws_url.clone()).with_reconnect(self.reconnect.clone())
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<ConsoleConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ConsoleConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_ws_url_is_set() {
        let config = load(&[("VIGIL_WS_URL", "ws://localhost:5000/ws")]).unwrap();

        assert_eq!(config.api_base_url, "http://localhost:5000/api");
        assert_eq!(config.store_url.as_deref(), Some(DEFAULT_STORE_URL));
        assert_eq!(config.reconnect, ReconnectConfig::default());
        assert!(config.wipe_on_disconnect);
    }

    #[test]
    fn ws_url_is_required() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("VIGIL_WS_URL")));
        assert_matches!(
            load(&[("VIGIL_WS_URL", "  ")]),
            Err(ConfigError::Missing("VIGIL_WS_URL"))
        );
    }

    #[test]
    fn empty_store_url_disables_cache() {
        let config = load(&[("VIGIL_WS_URL", "ws://x"), ("VIGIL_STORE_URL", "")]).unwrap();
        assert_eq!(config.store_url, None);
        assert_eq!(config.store_config().database_url, None);
    }

    #[test]
    fn reconnect_overrides() {
        let config = load(&[
            ("VIGIL_WS_URL", "ws://x"),
            ("VIGIL_RECONNECT_MAX_ATTEMPTS", "8"),
            ("VIGIL_RECONNECT_DELAY_MS", "250"),
            ("VIGIL_RECONNECT_BACKOFF", "exponential"),
            ("VIGIL_WIPE_ON_DISCONNECT", "false"),
        ])
        .unwrap();

        assert_eq!(config.reconnect.max_attempts, 8);
        assert_eq!(config.reconnect.delay, Duration::from_millis(250));
        assert_matches!(config.reconnect.backoff, Backoff::Exponential { .. });
        assert!(!config.wipe_on_disconnect);
        assert_eq!(config.channel_config().reconnect, config.reconnect);
    }

    #[test]
    fn malformed_values_are_rejected() {
        assert_matches!(
            load(&[("VIGIL_WS_URL", "ws://x"), ("VIGIL_RECONNECT_MAX_ATTEMPTS", "five")]),
            Err(ConfigError::Invalid { name: "VIGIL_RECONNECT_MAX_ATTEMPTS", .. })
        );
        assert_matches!(
            load(&[("VIGIL_WS_URL", "ws://x"), ("VIGIL_RECONNECT_BACKOFF", "random")]),
            Err(ConfigError::Invalid { name: "VIGIL_RECONNECT_BACKOFF", .. })
        );
    }
}
