use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Runtime configuration, sourced from `CONVOY_*` environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub vault_addr: String,
    pub vault_token: Option<String>,
    pub vault_role: String,
    /// Renew a lease when this many seconds remain.
    pub renewal_threshold_secs: i64,
    /// Seconds between renewal loop ticks.
    pub poll_interval_secs: u64,
    /// Whether the background renewal task runs at all.
    pub auto_renew: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            vault_addr: "http://127.0.0.1:8200".to_string(),
            vault_token: None,
            vault_role: "convoy-agent".to_string(),
            renewal_threshold_secs: 300,
            poll_interval_secs: 30,
            auto_renew: true,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            vault_addr: std::env::var("CONVOY_VAULT_ADDR").unwrap_or(defaults.vault_addr),
            vault_token: std::env::var("CONVOY_VAULT_TOKEN").ok(),
            vault_role: std::env::var("CONVOY_VAULT_ROLE").unwrap_or(defaults.vault_role),
            renewal_threshold_secs: env_parse("CONVOY_RENEWAL_THRESHOLD_SECONDS")
                .unwrap_or(defaults.renewal_threshold_secs),
            poll_interval_secs: env_parse("CONVOY_POLL_INTERVAL_SECONDS")
                .unwrap_or(defaults.poll_interval_secs),
            auto_renew: std::env::var("CONVOY_AUTO_RENEW")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(defaults.auto_renew),
        }
    }
}

fn env_parse<T: FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.renewal_threshold_secs, 300);
        assert_eq!(config.poll_interval_secs, 30);
        assert!(config.auto_renew);
    }
}
