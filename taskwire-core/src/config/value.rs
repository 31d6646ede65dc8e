//! `ConfigValue`: a dynamically-typed configuration leaf, and the
//! dotted-path lookup table it lives in.

use std::collections::HashMap;

/// One configuration leaf value, loaded from YAML, `.env`, or an
/// environment variable overlay (spec SPEC_FULL §2 "Configuration").
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValue {
    String(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<ConfigValue>),
}

impl ConfigValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            ConfigValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            ConfigValue::Float(v) => Some(*v),
            ConfigValue::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Parse a `serde_yaml::Value` leaf/list into a `ConfigValue`.
    /// Mappings are flattened by the caller (`loader::flatten`), not
    /// here.
    pub fn from_yaml(value: &serde_yaml::Value) -> Option<ConfigValue> {
        match value {
            serde_yaml::Value::String(s) => Some(ConfigValue::String(s.clone())),
            serde_yaml::Value::Bool(b) => Some(ConfigValue::Bool(*b)),
            serde_yaml::Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(ConfigValue::Int(i))
                } else {
                    n.as_f64().map(ConfigValue::Float)
                }
            }
            serde_yaml::Value::Sequence(seq) => {
                Some(ConfigValue::List(seq.iter().filter_map(ConfigValue::from_yaml).collect()))
            }
            _ => None,
        }
    }

    /// Parse a raw environment-variable string, trying bool/int/float
    /// before falling back to a plain string (spec: env overlay values
    /// arrive untyped).
    pub fn from_env_str(raw: &str) -> ConfigValue {
        if let Ok(b) = raw.parse::<bool>() {
            return ConfigValue::Bool(b);
        }
        if let Ok(i) = raw.parse::<i64>() {
            return ConfigValue::Int(i);
        }
        if let Ok(f) = raw.parse::<f64>() {
            return ConfigValue::Float(f);
        }
        ConfigValue::String(raw.to_string())
    }
}

pub type ConfigMap = HashMap<String, ConfigValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_str_prefers_narrower_types() {
        assert_eq!(ConfigValue::from_env_str("true"), ConfigValue::Bool(true));
        assert_eq!(ConfigValue::from_env_str("42"), ConfigValue::Int(42));
        assert_eq!(ConfigValue::from_env_str("3.5"), ConfigValue::Float(3.5));
        assert_eq!(ConfigValue::from_env_str("hello"), ConfigValue::String("hello".into()));
    }
}
