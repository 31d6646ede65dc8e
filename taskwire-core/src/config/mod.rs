//! `TaskwireConfig`: layered configuration loading, grounded in the
//! teacher's `r2e-core/src/config/mod.rs` (`R2eConfig`) — YAML base +
//! profile overlay + environment-variable overlay, addressed by dotted
//! path.

mod value;

pub use value::{ConfigMap, ConfigValue};

use std::collections::HashMap;
use std::env;

/// Failure modes for configuration loading and lookup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("configuration key not found: {0}")]
    NotFound(String),
    #[error("configuration key {key} has the wrong type: {message}")]
    TypeMismatch { key: String, message: String },
    #[error("failed to load configuration: {0}")]
    Load(String),
}

/// Flattened, dotted-path configuration table with a load order of
/// `application.yaml` -> `application-{profile}.yaml` -> environment
/// variable overlay (`APP_DATABASE_URL` -> `database.url`), mirroring
/// the teacher's `R2eConfig` precedence (later sources win).
#[derive(Debug, Clone, Default)]
pub struct TaskwireConfig {
    values: ConfigMap,
    profile: String,
}

impl TaskwireConfig {
    pub fn empty() -> Self {
        Self { values: HashMap::new(), profile: "default".to_string() }
    }

    pub fn profile(&self) -> &str {
        &self.profile
    }

    /// Parse a YAML document into a flattened config, overlaying
    /// environment variables prefixed with `APP_` last (spec SPEC_FULL
    /// §2, teacher's `application.yaml` convention).
    pub fn from_yaml_str(yaml: &str, profile: impl Into<String>) -> Result<Self, ConfigError> {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(yaml).map_err(|e| ConfigError::Load(e.to_string()))?;
        let mut values = HashMap::new();
        flatten(&doc, "", &mut values);
        let mut config = Self { values, profile: profile.into() };
        config.overlay_env("APP_");
        Ok(config)
    }

    /// Load `base` (the default profile) then merge `overlay` (a
    /// profile-specific document) over it, keys in `overlay` winning
    /// (spec SPEC_FULL §2 "application-{profile}.yaml").
    pub fn merge_profile(mut self, overlay_yaml: &str) -> Result<Self, ConfigError> {
        let doc: serde_yaml::Value =
            serde_yaml::from_str(overlay_yaml).map_err(|e| ConfigError::Load(e.to_string()))?;
        let mut overlay = HashMap::new();
        flatten(&doc, "", &mut overlay);
        self.values.extend(overlay);
        self.overlay_env("APP_");
        Ok(self)
    }

    /// Overlay process environment variables with the given prefix,
    /// converting `PREFIX_DATABASE_URL` to dotted key `database.url`.
    fn overlay_env(&mut self, prefix: &str) {
        for (key, value) in env::vars() {
            if let Some(rest) = key.strip_prefix(prefix) {
                let dotted = rest.to_ascii_lowercase().replace("__", ".").replace('_', ".");
                self.values.insert(dotted, ConfigValue::from_env_str(&value));
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Result<&str, ConfigError> {
        self.values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?
            .as_str()
            .ok_or_else(|| ConfigError::TypeMismatch { key: key.to_string(), message: "expected string".into() })
    }

    pub fn get_int(&self, key: &str) -> Result<i64, ConfigError> {
        self.values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?
            .as_int()
            .ok_or_else(|| ConfigError::TypeMismatch { key: key.to_string(), message: "expected int".into() })
    }

    pub fn get_bool(&self, key: &str) -> Result<bool, ConfigError> {
        self.values
            .get(key)
            .ok_or_else(|| ConfigError::NotFound(key.to_string()))?
            .as_bool()
            .ok_or_else(|| ConfigError::TypeMismatch { key: key.to_string(), message: "expected bool".into() })
    }

    pub fn set(&mut self, key: impl Into<String>, value: ConfigValue) {
        self.values.insert(key.into(), value);
    }
}

fn flatten(value: &serde_yaml::Value, prefix: &str, out: &mut ConfigMap) {
    if let serde_yaml::Value::Mapping(map) = value {
        for (k, v) in map {
            let serde_yaml::Value::String(key) = k else { continue };
            let dotted = if prefix.is_empty() { key.clone() } else { format!("{prefix}.{key}") };
            if matches!(v, serde_yaml::Value::Mapping(_)) {
                flatten(v, &dotted, out);
            } else if let Some(leaf) = ConfigValue::from_yaml(v) {
                out.insert(dotted, leaf);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "\
server:
  port: 8080
  host: \"0.0.0.0\"
session:
  max_idle_secs: 300
";

    #[test]
    fn flattens_nested_yaml_to_dotted_keys() {
        let config = TaskwireConfig::from_yaml_str(BASE, "default").unwrap();
        assert_eq!(config.get_int("server.port").unwrap(), 8080);
        assert_eq!(config.get_str("server.host").unwrap(), "0.0.0.0");
        assert_eq!(config.get_int("session.max_idle_secs").unwrap(), 300);
    }

    #[test]
    fn profile_overlay_wins_over_base() {
        let overlay = "server:\n  port: 9090\n";
        let config = TaskwireConfig::from_yaml_str(BASE, "prod").unwrap().merge_profile(overlay).unwrap();
        assert_eq!(config.get_int("server.port").unwrap(), 9090);
        assert_eq!(config.get_str("server.host").unwrap(), "0.0.0.0");
    }

    #[test]
    fn missing_key_is_not_found() {
        let config = TaskwireConfig::from_yaml_str(BASE, "default").unwrap();
        assert!(matches!(config.get_str("nope"), Err(ConfigError::NotFound(_))));
    }
}
