//! Configuration fragments
//!
//! A fragment is the ordered set of settings read from one source. Sources
//! are settings files in the assignment syntax, TOML tables or JSON
//! objects, chosen by file extension.

use serde::Serialize;
use sha2::{Digest, Sha256};
use siteconf_syntax::{is_identifier, parse_with_scope, Scope, Value};
use std::fs;
use std::path::Path;
use tracing::debug;

use super::error::ConfigError;

/// Where a fragment came from
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ConfigOrigin {
    /// Read from a file
    File,
    /// Command-line `--set` overrides
    Cli,
    /// Built in memory by the caller
    Memory,
}

/// A contributing config source with provenance
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ConfigSource {
    pub origin: ConfigOrigin,

    /// File path (None for cli/memory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// SHA-256 digest of raw file bytes (None for cli/memory)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub digest: Option<String>,
}

impl ConfigSource {
    pub fn file(path: &Path, digest: String) -> Self {
        Self {
            origin: ConfigOrigin::File,
            path: Some(path.display().to_string()),
            digest: Some(digest),
        }
    }

    pub fn cli() -> Self {
        Self {
            origin: ConfigOrigin::Cli,
            path: None,
            digest: None,
        }
    }

    pub fn memory() -> Self {
        Self {
            origin: ConfigOrigin::Memory,
            path: None,
            digest: None,
        }
    }

    /// Identifier used in errors and diagnostics.
    pub fn label(&self) -> &str {
        match (&self.path, self.origin) {
            (Some(path), _) => path,
            (None, ConfigOrigin::Cli) => "cli",
            (None, _) => "memory",
        }
    }
}

/// Source format, selected by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FragmentFormat {
    /// `NAME = expression` statements (`.py`, or any other extension)
    Assignments,
    Toml,
    Json,
}

impl FragmentFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => FragmentFormat::Toml,
            Some(ext) if ext.eq_ignore_ascii_case("json") => FragmentFormat::Json,
            _ => FragmentFormat::Assignments,
        }
    }
}

/// Ordered settings from a single source
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigFragment {
    source: ConfigSource,
    settings: Vec<(String, Value)>,
}

impl ConfigFragment {
    pub fn new(source: ConfigSource) -> Self {
        Self {
            source,
            settings: Vec::new(),
        }
    }

    /// Build an in-memory fragment from name/value pairs.
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let mut fragment = Self::new(ConfigSource::memory());
        for (name, value) in pairs {
            fragment.insert(name, value);
        }
        fragment
    }

    /// Bind `name`. A repeated name keeps its first position and takes the
    /// new value.
    pub fn insert(&mut self, name: impl Into<String>, value: Value) {
        let name = name.into();
        match self.settings.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.settings.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.settings
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    pub fn source(&self) -> &ConfigSource {
        &self.source
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.settings.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.settings.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.settings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.settings.is_empty()
    }

    pub(crate) fn into_parts(self) -> (ConfigSource, Vec<(String, Value)>) {
        (self.source, self.settings)
    }

    /// Load a fragment from disk.
    ///
    /// `scope` holds the settings resolved from earlier fragments; names in
    /// assignment-syntax expressions may refer to them.
    pub fn load(path: &Path, scope: &dyn Scope) -> Result<Self, ConfigError> {
        let location = path.display().to_string();
        let bytes = fs::read(path).map_err(|e| ConfigError::not_found(&location, e))?;

        let mut hasher = Sha256::new();
        hasher.update(&bytes);
        let digest = hex::encode(hasher.finalize());

        let contents = String::from_utf8(bytes)
            .map_err(|e| ConfigError::parse(&location, format!("invalid UTF-8: {}", e)))?;

        let format = FragmentFormat::from_path(path);
        debug!(path = %location, ?format, digest = %digest, "loading config fragment");

        let mut fragment = Self::new(ConfigSource::file(path, digest));
        match format {
            FragmentFormat::Assignments => {
                fragment.extend_from_assignments(&contents, scope)?
            }
            FragmentFormat::Toml => fragment.extend_from_toml(&contents)?,
            FragmentFormat::Json => fragment.extend_from_json(&contents)?,
        }
        Ok(fragment)
    }

    /// Parse assignment-syntax text into this fragment.
    pub fn extend_from_assignments(
        &mut self,
        contents: &str,
        scope: &dyn Scope,
    ) -> Result<(), ConfigError> {
        let location = self.source.label().to_string();
        let doc = parse_with_scope(contents, scope)
            .map_err(|e| ConfigError::syntax(&location, e))?;
        for import in &doc.imports {
            debug!(
                path = %location,
                module = %import.module,
                line = import.line,
                "ignoring import; layers are given explicitly"
            );
        }
        for assignment in doc.assignments {
            self.insert(assignment.name, assignment.value);
        }
        Ok(())
    }

    fn extend_from_toml(&mut self, contents: &str) -> Result<(), ConfigError> {
        let location = self.source.label().to_string();
        let table: toml::Table = toml::from_str(contents).map_err(|e| {
            match e.span().map(|span| line_column(contents, span.start)) {
                Some((line, column)) => ConfigError::parse_at(&location, line, column, e.message()),
                None => ConfigError::parse(&location, e.message()),
            }
        })?;
        for (name, value) in table {
            check_name(&location, &name)?;
            let value = toml_to_value(value).map_err(|m| {
                ConfigError::parse(&location, format!("{}: {}", name, m))
            })?;
            self.insert(name, value);
        }
        Ok(())
    }

    fn extend_from_json(&mut self, contents: &str) -> Result<(), ConfigError> {
        let location = self.source.label().to_string();
        let json: serde_json::Value = serde_json::from_str(contents)
            .map_err(|e| ConfigError::parse_at(&location, e.line(), e.column(), e.to_string()))?;
        let map = match json {
            serde_json::Value::Object(map) => map,
            other => {
                return Err(ConfigError::parse(
                    &location,
                    format!("top level must be an object, found {}", json_kind(&other)),
                ));
            }
        };
        for (name, value) in map {
            check_name(&location, &name)?;
            self.insert(name, Value::from_json(value));
        }
        Ok(())
    }
}

fn check_name(location: &str, name: &str) -> Result<(), ConfigError> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(ConfigError::parse(
            location,
            format!("'{}' is not a valid setting name", name),
        ))
    }
}

/// Convert TOML value to a setting value
fn toml_to_value(toml: toml::Value) -> Result<Value, String> {
    Ok(match toml {
        toml::Value::String(s) => Value::Str(s),
        toml::Value::Integer(i) => Value::Int(i),
        toml::Value::Float(f) => {
            if !f.is_finite() {
                return Err(format!("non-finite float {} is not supported", f));
            }
            Value::Float(f)
        }
        toml::Value::Boolean(b) => Value::Bool(b),
        toml::Value::Datetime(dt) => Value::Str(dt.to_string()),
        toml::Value::Array(arr) => Value::List(
            arr.into_iter()
                .map(toml_to_value)
                .collect::<Result<Vec<_>, _>>()?,
        ),
        toml::Value::Table(table) => Value::Dict(
            table
                .into_iter()
                .map(|(k, v)| toml_to_value(v).map(|v| (k, v)))
                .collect::<Result<Vec<_>, _>>()?,
        ),
    })
}

fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}

/// 1-based line and column of a byte offset.
fn line_column(contents: &str, offset: usize) -> (usize, usize) {
    let prefix = contents.get(..offset).unwrap_or(contents);
    let line = prefix.matches('\n').count() + 1;
    let column = prefix
        .rsplit('\n')
        .next()
        .map(|l| l.chars().count() + 1)
        .unwrap_or(1);
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;
    use siteconf_syntax::EmptyScope;
    use std::collections::BTreeMap;
    use std::io::Write;
    use tempfile::{Builder, NamedTempFile};

    fn temp_with(suffix: &str, contents: &str) -> NamedTempFile {
        let mut temp = Builder::new().suffix(suffix).tempfile().unwrap();
        write!(temp, "{}", contents).unwrap();
        temp
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(
            FragmentFormat::from_path(Path::new("pelicanconf.py")),
            FragmentFormat::Assignments
        );
        assert_eq!(
            FragmentFormat::from_path(Path::new("site.TOML")),
            FragmentFormat::Toml
        );
        assert_eq!(
            FragmentFormat::from_path(Path::new("site.json")),
            FragmentFormat::Json
        );
        assert_eq!(
            FragmentFormat::from_path(Path::new("settings")),
            FragmentFormat::Assignments
        );
    }

    #[test]
    fn test_insert_repeated_name_keeps_position() {
        let mut fragment = ConfigFragment::new(ConfigSource::memory());
        fragment.insert("A", Value::Int(1));
        fragment.insert("B", Value::Int(2));
        fragment.insert("A", Value::Int(3));
        let names: Vec<&str> = fragment.names().collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(fragment.get("A"), Some(&Value::Int(3)));
    }

    #[test]
    fn test_load_assignments() {
        let temp = temp_with(".py", "SITENAME = 'x'\nTHEME = 't'\n");
        let fragment = ConfigFragment::load(temp.path(), &EmptyScope).unwrap();
        assert_eq!(fragment.len(), 2);
        assert_eq!(fragment.source().origin, ConfigOrigin::File);
        assert_eq!(fragment.source().digest.as_ref().map(|d| d.len()), Some(64));
    }

    #[test]
    fn test_load_with_scope() {
        let temp = temp_with(".py", "from pelicanconf import *\nSITEURL = BASE + '/blog'\n");
        let mut scope = BTreeMap::new();
        scope.insert("BASE".to_string(), Value::Str("https://example.org".into()));
        let fragment = ConfigFragment::load(temp.path(), &scope).unwrap();
        assert_eq!(
            fragment.get("SITEURL"),
            Some(&Value::Str("https://example.org/blog".into()))
        );
    }

    #[test]
    fn test_load_toml() {
        let temp = temp_with(
            ".toml",
            "SITENAME = \"x\"\nSTATIC_PATHS = [\"extra\"]\n\n[EXTRA_PATH_METADATA.\"extra/favicon.ico\"]\npath = \"favicon.ico\"\n",
        );
        let fragment = ConfigFragment::load(temp.path(), &EmptyScope).unwrap();
        let names: Vec<&str> = fragment.names().collect();
        assert_eq!(names, vec!["SITENAME", "STATIC_PATHS", "EXTRA_PATH_METADATA"]);
        let meta = fragment.get("EXTRA_PATH_METADATA").unwrap();
        assert_eq!(
            meta.get("extra/favicon.ico").and_then(|m| m.get("path")),
            Some(&Value::Str("favicon.ico".into()))
        );
    }

    #[test]
    fn test_load_toml_syntax_error_has_position() {
        let temp = temp_with(".toml", "SITENAME = \"x\"\nTHEME = \n");
        let err = ConfigFragment::load(temp.path(), &EmptyScope).unwrap_err();
        match err {
            ConfigError::ParseError { line, .. } => assert_eq!(line, Some(2)),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_json_rejects_non_object() {
        let temp = temp_with(".json", "[1, 2]");
        let err = ConfigFragment::load(temp.path(), &EmptyScope).unwrap_err();
        assert!(err.to_string().contains("top level must be an object"));
    }

    #[test]
    fn test_load_json_rejects_bad_name() {
        let temp = temp_with(".json", "{\"site-name\": \"x\"}");
        let err = ConfigFragment::load(temp.path(), &EmptyScope).unwrap_err();
        assert!(err.to_string().contains("not a valid setting name"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = ConfigFragment::load(Path::new("/nonexistent/siteconf/base.py"), &EmptyScope)
            .unwrap_err();
        assert!(matches!(err, ConfigError::SourceNotFound { .. }));
        assert_eq!(err.location(), Some("/nonexistent/siteconf/base.py"));
    }

    #[test]
    fn test_load_invalid_utf8() {
        let mut temp = Builder::new().suffix(".py").tempfile().unwrap();
        temp.write_all(&[b'A', b' ', b'=', b' ', 0xff, 0xfe]).unwrap();
        let err = ConfigFragment::load(temp.path(), &EmptyScope).unwrap_err();
        assert!(err.to_string().contains("invalid UTF-8"));
    }

    #[test]
    fn test_line_column() {
        assert_eq!(line_column("a\nbc\n", 0), (1, 1));
        assert_eq!(line_column("a\nbc\n", 3), (2, 2));
    }
}
