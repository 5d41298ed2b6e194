//! Helper configuration options

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use crate::error::{Result, ViewError};

/// Option overriding which class an alias resolves to.
pub const CLASS_NAME: &str = "className";
/// Option gating event bus registration. Defaults to `true`.
pub const ENABLED: &str = "enabled";

/// Option map handed unchanged to a helper constructor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Config(Map<String, Value>);

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Config whose `className` points at `class_name`.
    pub fn for_class(class_name: impl Into<String>) -> Self {
        Self::new().with_class_name(class_name)
    }

    pub fn from_json(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            Value::Null => Ok(Self::default()),
            other => Err(ViewError::ConfigError(format!(
                "helper config must be an object, got {}",
                other
            ))),
        }
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn with_class_name(self, class_name: impl Into<String>) -> Self {
        self.with(CLASS_NAME, Value::String(class_name.into()))
    }

    pub fn with_enabled(self, enabled: bool) -> Self {
        self.with(ENABLED, enabled)
    }

    pub fn class_name(&self) -> Option<&str> {
        self.0.get(CLASS_NAME).and_then(Value::as_str)
    }

    /// Whether the helper should be attached to the event bus.
    ///
    /// Anything other than an explicit `false` counts as enabled.
    pub fn enabled(&self) -> bool {
        !matches!(self.0.get(ENABLED), Some(Value::Bool(false)))
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Fill in keys missing from `self` with the values from `defaults`.
    #[must_use]
    pub fn merged_with_defaults(mut self, defaults: &Config) -> Self {
        for (key, value) in &defaults.0 {
            self.0.entry(key.clone()).or_insert_with(|| value.clone());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for Config {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_enabled_defaults_to_true() {
        assert!(Config::new().enabled());
        assert!(Config::new().with_enabled(true).enabled());
        assert!(!Config::new().with_enabled(false).enabled());
        assert!(Config::new().with(ENABLED, "no").enabled());
    }

    #[test]
    fn test_class_name_override() {
        let config = Config::for_class("Blog.Comment");
        assert_eq!(config.class_name(), Some("Blog.Comment"));
        assert_eq!(Config::new().class_name(), None);
    }

    #[test]
    fn test_from_json() {
        let config = Config::from_json(json!({"className": "Html", "escape": false})).unwrap();
        assert_eq!(config.class_name(), Some("Html"));
        assert_eq!(config.get_bool("escape"), Some(false));

        assert!(Config::from_json(json!(null)).unwrap().is_empty());
        assert!(matches!(
            Config::from_json(json!([1, 2])),
            Err(ViewError::ConfigError(_))
        ));
    }

    #[test]
    fn test_merge_keeps_caller_values() {
        let defaults = Config::new().with("escape", true).with("templates", "default");
        let config = Config::new().with("escape", false).merged_with_defaults(&defaults);

        assert_eq!(config.get_bool("escape"), Some(false));
        assert_eq!(config.get_str("templates"), Some("default"));
    }

    #[test]
    fn test_serde_transparent() {
        let config = Config::new().with_enabled(false);
        let text = serde_json::to_string(&config).unwrap();
        assert_eq!(text, r#"{"enabled":false}"#);
        let back: Config = serde_json::from_str(&text).unwrap();
        assert_eq!(back, config);
    }
}
