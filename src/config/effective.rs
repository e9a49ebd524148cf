//! Effective configuration with full provenance
//!
//! The effective configuration is the merged settings mapping plus the
//! list of sources it was built from and, for every setting, the source
//! that supplied its final value. It is immutable once built.

use chrono::{DateTime, Utc};
use serde::Serialize;
use siteconf_syntax::Value;
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

use super::fragment::{ConfigFragment, ConfigSource};
use super::merge::{merge_fragments, Merged};

/// Schema identifier written with JSON output
pub const SCHEMA_ID: &str = "siteconf/effective_config@1";

/// Effective configuration with full provenance
#[derive(Debug, Clone, Serialize)]
pub struct EffectiveConfig {
    schema_id: &'static str,

    /// When this config was computed
    created_at: DateTime<Utc>,

    /// The merged settings
    settings: BTreeMap<String, Value>,

    /// Contributing sources in precedence order
    sources: Vec<ConfigSource>,

    /// Setting name to index in `sources`
    provenance: BTreeMap<String, usize>,
}

impl EffectiveConfig {
    /// Fold in-memory fragments into an effective configuration.
    pub fn fold(fragments: impl IntoIterator<Item = ConfigFragment>) -> Self {
        Self::from_merged(merge_fragments(fragments))
    }

    pub(crate) fn from_merged(merged: Merged) -> Self {
        Self {
            schema_id: SCHEMA_ID,
            created_at: Utc::now(),
            settings: merged.settings,
            sources: merged.sources,
            provenance: merged.provenance,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.settings.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.settings.contains_key(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(Value::as_str)
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(Value::as_bool)
    }

    /// The source that supplied the final value of `name`.
    pub fn origin_of(&self, name: &str) -> Option<&ConfigSource> {
        self.provenance
            .get(name)
            .and_then(|&index| self.sources.get(index))
    }

    /// Settings in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.settings.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn settings(&self) -> &BTreeMap<String, Value> {
        &self.settings
    }

    pub fn sources(&self) -> &[ConfigSource] {
        &self.sources
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    /// Settings as a JSON object.
    pub fn settings_json(&self) -> serde_json::Value {
        serde_json::Value::Object(
            self.settings
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }

    /// Serialize to JSON, including sources and provenance
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write to file
    pub fn write_to_file(&self, path: &Path) -> io::Result<()> {
        let json = self.to_json().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON serialization failed: {}", e),
            )
        })?;
        fs::write(path, json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::fragment::ConfigOrigin;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    fn sample() -> EffectiveConfig {
        EffectiveConfig::fold(vec![
            ConfigFragment::from_pairs([("SITENAME", s("x")), ("AUTHOR", s("a"))]),
            ConfigFragment::from_pairs([("SITENAME", s("y")), ("RELATIVE_URLS", Value::Bool(true))]),
        ])
    }

    #[test]
    fn test_accessors() {
        let config = sample();
        assert_eq!(config.len(), 3);
        assert_eq!(config.get_str("SITENAME"), Some("y"));
        assert_eq!(config.get_bool("RELATIVE_URLS"), Some(true));
        assert!(config.get("THEME").is_none());
        assert!(!config.contains("THEME"));
    }

    #[test]
    fn test_iter_in_name_order() {
        let config = sample();
        let names: Vec<&str> = config.iter().map(|(k, _)| k).collect();
        assert_eq!(names, vec!["AUTHOR", "RELATIVE_URLS", "SITENAME"]);
    }

    #[test]
    fn test_origin_of() {
        let config = sample();
        assert_eq!(config.sources().len(), 2);
        assert_eq!(
            config.origin_of("AUTHOR"),
            Some(&config.sources()[0])
        );
        assert_eq!(
            config.origin_of("SITENAME"),
            Some(&config.sources()[1])
        );
        assert_eq!(config.origin_of("SITENAME").map(|s| s.origin), Some(ConfigOrigin::Memory));
        assert!(config.origin_of("THEME").is_none());
    }

    #[test]
    fn test_to_json() {
        let config = sample();
        let json: serde_json::Value = serde_json::from_str(&config.to_json().unwrap()).unwrap();
        assert_eq!(json["schema_id"], SCHEMA_ID);
        assert_eq!(json["settings"]["SITENAME"], "y");
        assert_eq!(json["provenance"]["AUTHOR"], 0);
        assert_eq!(json["sources"][1]["origin"], "memory");
    }

    #[test]
    fn test_settings_json() {
        let config = sample();
        assert_eq!(
            config.settings_json(),
            serde_json::json!({"AUTHOR": "a", "RELATIVE_URLS": true, "SITENAME": "y"})
        );
    }

    #[test]
    fn test_write_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("effective.json");
        sample().write_to_file(&path).unwrap();
        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"SITENAME\": \"y\""));
    }
}
