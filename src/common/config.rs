//! Engine configuration
//!
//! Holds the knobs that change expression semantics (division scale, the
//! default collation, REGEXP caching) and the defaults every new session's
//! system variables are seeded from. Loadable from JSON.

use crate::common::constants::{DEFAULT_COLLATION, DEFAULT_DIV_PRECISION_INCREMENT};
use crate::common::error::{RefractError, RefractResult};
use crate::types::Collation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration shared by every statement executed against an engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Extra scale digits added to the left operand's scale by `/`
    pub div_precision_increment: u8,
    /// Collation assigned to text values that carry none
    pub default_collation: String,
    /// Cache compiled REGEXP patterns when the pattern is row-independent
    pub regex_cache: bool,
    /// Partition count for partitioned aggregation
    pub parallelism: usize,
    /// System variable defaults, keyed by lower-case name
    pub system_variables: BTreeMap<String, serde_json::Value>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let mut system_variables = BTreeMap::new();
        system_variables.insert("autocommit".to_string(), serde_json::json!(1));
        system_variables.insert(
            "div_precision_increment".to_string(),
            serde_json::json!(DEFAULT_DIV_PRECISION_INCREMENT),
        );
        system_variables.insert(
            "max_allowed_packet".to_string(),
            serde_json::json!(1u64 << 30),
        );
        system_variables.insert(
            "sql_mode".to_string(),
            serde_json::json!("STRICT_TRANS_TABLES,NO_ENGINE_SUBSTITUTION"),
        );
        system_variables.insert("time_zone".to_string(), serde_json::json!("SYSTEM"));
        system_variables.insert("version".to_string(), serde_json::json!("8.0.31"));
        system_variables.insert(
            "collation_connection".to_string(),
            serde_json::json!(DEFAULT_COLLATION),
        );

        Self {
            div_precision_increment: DEFAULT_DIV_PRECISION_INCREMENT,
            default_collation: DEFAULT_COLLATION.to_string(),
            regex_cache: true,
            parallelism: num_cpus::get().max(1),
            system_variables,
        }
    }
}

impl EngineConfig {
    /// Parse a configuration from JSON text; missing fields take their defaults
    pub fn from_json_str(text: &str) -> RefractResult<Self> {
        let config: EngineConfig = serde_json::from_str(text)
            .map_err(|e| RefractError::Config(format!("malformed configuration: {}", e)))?;
        config.validate()?;
        tracing::info!(
            div_precision_increment = config.div_precision_increment,
            default_collation = %config.default_collation,
            "loaded engine configuration"
        );
        Ok(config)
    }

    /// Read and parse a JSON configuration file
    pub fn from_file(path: impl AsRef<Path>) -> RefractResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> RefractResult<()> {
        Collation::from_name(&self.default_collation).map_err(|_| {
            RefractError::Config(format!(
                "unknown default collation '{}'",
                self.default_collation
            ))
        })?;
        if self.div_precision_increment > 30 {
            return Err(RefractError::Config(format!(
                "div_precision_increment must be between 0 and 30, got {}",
                self.div_precision_increment
            )));
        }
        if self.parallelism == 0 {
            return Err(RefractError::Config(
                "parallelism must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// The collation named by `default_collation`
    pub fn collation(&self) -> Collation {
        Collation::from_name(&self.default_collation).unwrap_or_default()
    }

    /// Override a system variable default
    pub fn set_variable(&mut self, name: &str, value: serde_json::Value) {
        let name = name.to_lowercase();
        tracing::debug!(variable = %name, value = %value, "system variable default set");
        if name == "div_precision_increment" {
            if let Some(n) = value.as_u64() {
                self.div_precision_increment = n.min(30) as u8;
            }
        }
        self.system_variables.insert(name, value);
    }

    /// Look up a system variable default
    pub fn variable(&self, name: &str) -> Option<&serde_json::Value> {
        self.system_variables.get(&name.to_lowercase())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.div_precision_increment, 4);
        assert_eq!(config.default_collation, "utf8mb4_0900_bin");
        assert!(config.parallelism >= 1);
        assert_eq!(config.variable("AUTOCOMMIT"), Some(&serde_json::json!(1)));
    }

    #[test]
    fn test_partial_json_keeps_defaults() -> RefractResult<()> {
        let config = EngineConfig::from_json_str(r#"{"div_precision_increment": 6}"#)?;
        assert_eq!(config.div_precision_increment, 6);
        assert!(config.regex_cache);
        assert!(config.variable("sql_mode").is_some());
        Ok(())
    }

    #[test]
    fn test_rejects_unknown_collation() {
        let result = EngineConfig::from_json_str(r#"{"default_collation": "klingon_ci"}"#);
        assert!(matches!(result, Err(RefractError::Config(_))));
    }

    #[test]
    fn test_rejects_malformed_json() {
        assert!(matches!(
            EngineConfig::from_json_str("{not json"),
            Err(RefractError::Config(_))
        ));
    }

    #[test]
    fn test_set_variable_updates_division_scale() {
        let mut config = EngineConfig::default();
        config.set_variable("DIV_PRECISION_INCREMENT", serde_json::json!(2));
        assert_eq!(config.div_precision_increment, 2);
        assert_eq!(
            config.variable("div_precision_increment"),
            Some(&serde_json::json!(2))
        );
    }
}
