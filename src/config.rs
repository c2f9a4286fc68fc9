// SPDX-License-Identifier: Apache-2.0

//! Engine configuration
//!
//! Read from an optional JSON file, then overridden by `POCKET_FED_*`
//! environment variables.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::federation::fanout::FanoutPolicy;
use pocket_core::{FederationError, FederationResult};

/// Row count above which the planner switches from nested-loop to hash-join.
pub const DEFAULT_HASH_JOIN_THRESHOLD: usize = 100;

/// Planning durations kept for the rolling average.
pub const DEFAULT_PLAN_HISTORY_CAPACITY: usize = 100;

/// Reserved field stamped on every fetched document.
pub const DEFAULT_SOURCE_TAG_FIELD: &str = "_sourceDatabase";

/// Field holding the matched counterpart when a joined row is flattened.
pub const DEFAULT_JOINED_FIELD: &str = "_joined";

const ENV_HASH_JOIN_THRESHOLD: &str = "POCKET_FED_HASH_JOIN_THRESHOLD";
const ENV_PARTIAL_FAILURES: &str = "POCKET_FED_PARTIAL_FAILURES";
const ENV_SOURCE_TIMEOUT_MS: &str = "POCKET_FED_SOURCE_TIMEOUT_MS";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FederationConfig {
    pub hash_join_threshold: usize,
    pub plan_history_capacity: usize,
    pub source_tag_field: String,
    pub joined_field: String,
    /// Keep going when a source fails, reporting it in the result.
    pub tolerate_partial_failures: bool,
    /// Wraps every registered executor in a per-call timeout when set.
    pub source_timeout_ms: Option<u64>,
}

impl Default for FederationConfig {
    fn default() -> Self {
        Self {
            hash_join_threshold: DEFAULT_HASH_JOIN_THRESHOLD,
            plan_history_capacity: DEFAULT_PLAN_HISTORY_CAPACITY,
            source_tag_field: DEFAULT_SOURCE_TAG_FIELD.to_string(),
            joined_field: DEFAULT_JOINED_FIELD.to_string(),
            tolerate_partial_failures: false,
            source_timeout_ms: None,
        }
    }
}

impl FederationConfig {
    /// Loads the file at `path` (defaults when it does not exist), then applies env overrides.
    pub fn load(path: &Path) -> FederationResult<Self> {
        let mut config = if path.exists() {
            let content = std::fs::read_to_string(path).map_err(|e| {
                FederationError::config(format!("Failed to read {}: {}", path.display(), e))
            })?;
            let config: Self = serde_json::from_str(&content).map_err(|e| {
                FederationError::config(format!("Failed to parse {}: {}", path.display(), e))
            })?;
            info!("Loaded federation configuration from {:?}", path);
            config
        } else {
            debug!("No federation config file at {:?}, using defaults", path);
            Self::default()
        };

        config.apply_env_overrides();
        Ok(config.normalized())
    }

    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup; unparsable values are logged and skipped.
    pub fn apply_overrides_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(raw) = lookup(ENV_HASH_JOIN_THRESHOLD) {
            match raw.trim().parse() {
                Ok(threshold) => self.hash_join_threshold = threshold,
                Err(_) => warn!(key = ENV_HASH_JOIN_THRESHOLD, value = %raw, "Ignoring invalid override"),
            }
        }

        if let Some(raw) = lookup(ENV_PARTIAL_FAILURES) {
            match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" => self.tolerate_partial_failures = true,
                "0" | "false" | "no" => self.tolerate_partial_failures = false,
                _ => warn!(key = ENV_PARTIAL_FAILURES, value = %raw, "Ignoring invalid override"),
            }
        }

        if let Some(raw) = lookup(ENV_SOURCE_TIMEOUT_MS) {
            match raw.trim().parse::<u64>() {
                Ok(0) => self.source_timeout_ms = None,
                Ok(ms) => self.source_timeout_ms = Some(ms),
                Err(_) => warn!(key = ENV_SOURCE_TIMEOUT_MS, value = %raw, "Ignoring invalid override"),
            }
        }
    }

    /// Clamps values the engine cannot work with.
    pub fn normalized(mut self) -> Self {
        self.plan_history_capacity = self.plan_history_capacity.max(1);
        if self.source_tag_field.is_empty() {
            self.source_tag_field = DEFAULT_SOURCE_TAG_FIELD.to_string();
        }
        if self.joined_field.is_empty() {
            self.joined_field = DEFAULT_JOINED_FIELD.to_string();
        }
        self
    }

    pub fn fanout_policy(&self) -> FanoutPolicy {
        if self.tolerate_partial_failures {
            FanoutPolicy::TolerateFailures
        } else {
            FanoutPolicy::FailFast
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = FederationConfig::load(&dir.path().join("federation.json")).unwrap();
        assert_eq!(config.hash_join_threshold, 100);
        assert_eq!(config.source_tag_field, "_sourceDatabase");
        assert_eq!(config.fanout_policy(), FanoutPolicy::FailFast);
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.json");
        std::fs::write(&path, r#"{"hashJoinThreshold": 10, "planHistoryCapacity": 0}"#).unwrap();

        let config = FederationConfig::load(&path).unwrap();
        assert_eq!(config.hash_join_threshold, 10);
        assert_eq!(config.plan_history_capacity, 1);
        assert_eq!(config.joined_field, "_joined");
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("federation.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(matches!(
            FederationConfig::load(&path),
            Err(FederationError::Config { .. })
        ));
    }

    #[test]
    fn overrides_apply_and_invalid_values_are_skipped() {
        let vars: HashMap<&str, &str> = [
            ("POCKET_FED_HASH_JOIN_THRESHOLD", "not-a-number"),
            ("POCKET_FED_PARTIAL_FAILURES", "true"),
            ("POCKET_FED_SOURCE_TIMEOUT_MS", "250"),
        ]
        .into_iter()
        .collect();

        let mut config = FederationConfig::default();
        config.apply_overrides_from(|key| vars.get(key).map(|v| v.to_string()));

        assert_eq!(config.hash_join_threshold, 100);
        assert!(config.tolerate_partial_failures);
        assert_eq!(config.source_timeout_ms, Some(250));
        assert_eq!(config.fanout_policy(), FanoutPolicy::TolerateFailures);
    }
}
