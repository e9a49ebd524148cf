//! Output formats for the effective configuration
//!
//! The external generator consumes the resolved settings either as JSON,
//! as a TOML table, or as a settings file in the assignment syntax.

use siteconf_syntax::Value;
use std::fmt::Write as _;
use tracing::warn;

use super::effective::EffectiveConfig;

/// Output format selector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Toml,
    Assignments,
}

impl EffectiveConfig {
    /// Render the settings as a TOML document.
    ///
    /// TOML has no null, so `None` values (and dict entries or list items
    /// holding `None`) are left out with a warning.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        let mut table = toml::Table::new();
        for (name, value) in self.iter() {
            match value_to_toml(name, value) {
                Some(v) => {
                    table.insert(name.to_string(), v);
                }
                None => warn!(setting = %name, "None cannot be represented in TOML; omitted"),
            }
        }
        toml::to_string(&table)
    }

    /// Render the settings as `NAME = literal` lines in name order.
    ///
    /// Parsing the result yields the same settings.
    pub fn to_assignments(&self) -> String {
        let mut out = String::new();
        let labels: Vec<&str> = self.sources().iter().map(|s| s.label()).collect();
        if !labels.is_empty() {
            let _ = writeln!(out, "# Resolved by siteconf from: {}", labels.join(", "));
        }
        for (name, value) in self.iter() {
            let _ = writeln!(out, "{} = {}", name, value);
        }
        out
    }

    /// Render in the chosen format. JSON output is either the settings
    /// object alone or the full provenance document.
    pub fn render(&self, format: OutputFormat, settings_only: bool) -> Result<String, String> {
        match format {
            OutputFormat::Json if settings_only => {
                serde_json::to_string_pretty(&self.settings_json()).map_err(|e| e.to_string())
            }
            OutputFormat::Json => self.to_json().map_err(|e| e.to_string()),
            OutputFormat::Toml => self.to_toml().map_err(|e| e.to_string()),
            OutputFormat::Assignments => Ok(self.to_assignments()),
        }
    }
}

fn value_to_toml(path: &str, value: &Value) -> Option<toml::Value> {
    Some(match value {
        Value::None => return None,
        Value::Bool(b) => toml::Value::Boolean(*b),
        Value::Int(i) => toml::Value::Integer(*i),
        Value::Float(f) => toml::Value::Float(*f),
        Value::Str(s) => toml::Value::String(s.clone()),
        Value::Tuple(items) | Value::List(items) => toml::Value::Array(
            items
                .iter()
                .enumerate()
                .filter_map(|(i, item)| {
                    let item_path = format!("{}[{}]", path, i);
                    let converted = value_to_toml(&item_path, item);
                    if converted.is_none() {
                        warn!(setting = %item_path, "None cannot be represented in TOML; omitted");
                    }
                    converted
                })
                .collect(),
        ),
        Value::Dict(entries) => {
            let mut table = toml::Table::new();
            for (key, item) in entries {
                let item_path = format!("{}.{}", path, key);
                match value_to_toml(&item_path, item) {
                    Some(v) => {
                        table.insert(key.clone(), v);
                    }
                    None => {
                        warn!(setting = %item_path, "None cannot be represented in TOML; omitted")
                    }
                }
            }
            toml::Value::Table(table)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFragment;
    use siteconf_syntax::parse;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    fn sample() -> EffectiveConfig {
        let mut fragment = ConfigFragment::from_pairs([
            ("SITENAME", s("mi-atlas")),
            ("FEED_ALL_ATOM", Value::None),
            (
                "LINKS",
                Value::Tuple(vec![Value::Tuple(vec![s("Pelican"), s("https://getpelican.com/")])]),
            ),
            (
                "EXTRA_PATH_METADATA",
                Value::Dict(vec![(
                    "extra/favicon.ico".into(),
                    Value::Dict(vec![("path".into(), s("favicon.ico"))]),
                )]),
            ),
        ]);
        fragment.insert("M_FINE_PRINT", s("mi-atlas. It's\nfine."));
        EffectiveConfig::fold(vec![fragment])
    }

    #[test]
    fn test_assignments_reparse() {
        let config = sample();
        let text = config.to_assignments();
        assert!(text.starts_with("# Resolved by siteconf from: memory\n"));
        assert!(text.contains("FEED_ALL_ATOM = None\n"));
        assert!(text.contains("LINKS = (('Pelican', 'https://getpelican.com/'),)\n"));

        let doc = parse(&text).unwrap();
        assert_eq!(doc.assignments.len(), config.len());
        for assignment in doc.assignments {
            assert_eq!(config.get(&assignment.name), Some(&assignment.value));
        }
    }

    #[test]
    fn test_toml_omits_none() {
        let config = sample();
        let text = config.to_toml().unwrap();
        let table: toml::Table = toml::from_str(&text).unwrap();
        assert!(!table.contains_key("FEED_ALL_ATOM"));
        assert_eq!(table["SITENAME"].as_str(), Some("mi-atlas"));
        assert_eq!(
            table["EXTRA_PATH_METADATA"]["extra/favicon.ico"]["path"].as_str(),
            Some("favicon.ico")
        );
        assert_eq!(table["LINKS"][0][1].as_str(), Some("https://getpelican.com/"));
    }

    #[test]
    fn test_render_json_settings_only() {
        let config = sample();
        let text = config.render(OutputFormat::Json, true).unwrap();
        let json: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(json["SITENAME"], "mi-atlas");
        assert!(json["FEED_ALL_ATOM"].is_null());
        assert!(json.get("sources").is_none());
    }
}
