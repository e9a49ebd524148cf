//! Catalog of recognized settings
//!
//! Maps setting names (exact or glob patterns such as `M_*`) to the value
//! shape the site generator expects, and checks an effective configuration
//! against it. Unknown settings are allowed and never reported.

use globset::{Glob, GlobSet, GlobSetBuilder};
use serde::Serialize;
use siteconf_syntax::Value;
use std::collections::HashMap;
use std::fmt;

use crate::config::EffectiveConfig;

/// Expected shape of a setting value
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    String,
    /// String, or `None` to disable
    OptionalString,
    Bool,
    /// `False` to disable, or a count
    BoolOrInt,
    /// `None` to disable, or a count
    OptionalInt,
    StringList,
    /// Sequence of sequences whose first two items are (label, URL)
    LinkList,
    /// Two-item sequence of strings
    StringPair,
    /// Dict of path to metadata dict
    PathMetadata,
    Any,
}

impl Shape {
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Shape::String => value.as_str().is_some(),
            Shape::OptionalString => value.is_none() || value.as_str().is_some(),
            Shape::Bool => value.as_bool().is_some(),
            Shape::BoolOrInt => value.as_bool().is_some() || value.as_i64().is_some(),
            Shape::OptionalInt => value.is_none() || value.as_i64().is_some(),
            Shape::StringList => value
                .as_seq()
                .is_some_and(|items| items.iter().all(|i| i.as_str().is_some())),
            Shape::LinkList => value.as_seq().is_some_and(|items| {
                items.iter().all(|link| {
                    link.as_seq().is_some_and(|parts| {
                        parts.len() >= 2 && parts[0].as_str().is_some() && parts[1].as_str().is_some()
                    })
                })
            }),
            Shape::StringPair => value
                .as_seq()
                .is_some_and(|parts| parts.len() == 2 && parts.iter().all(|p| p.as_str().is_some())),
            Shape::PathMetadata => value
                .as_dict()
                .is_some_and(|entries| entries.iter().all(|(_, meta)| meta.as_dict().is_some())),
            Shape::Any => true,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Shape::String => "string",
            Shape::OptionalString => "string or None",
            Shape::Bool => "bool",
            Shape::BoolOrInt => "False or integer",
            Shape::OptionalInt => "None or integer",
            Shape::StringList => "sequence of strings",
            Shape::LinkList => "sequence of (label, URL) pairs",
            Shape::StringPair => "(string, string) pair",
            Shape::PathMetadata => "mapping of path to metadata",
            Shape::Any => "any value",
        };
        f.write_str(text)
    }
}

/// A recognized setting name or pattern
#[derive(Debug, Clone, Copy, Serialize)]
pub struct SettingSpec {
    pub pattern: &'static str,
    pub shape: Shape,
    pub description: &'static str,
}

const fn spec(pattern: &'static str, shape: Shape, description: &'static str) -> SettingSpec {
    SettingSpec {
        pattern,
        shape,
        description,
    }
}

/// Built-in settings. Exact names are looked up first; patterns are tried
/// in order and the first match wins.
const BUILTIN_SETTINGS: &[SettingSpec] = &[
    spec("AUTHOR", Shape::String, "default author name"),
    spec("SITENAME", Shape::String, "site title"),
    spec("SITEURL", Shape::String, "base URL, empty for relative links"),
    spec("PATH", Shape::String, "content directory"),
    spec("TIMEZONE", Shape::String, "timezone used for dates"),
    spec("DEFAULT_LANG", Shape::String, "default content language"),
    spec("DEFAULT_PAGINATION", Shape::BoolOrInt, "items per index page, False to disable"),
    spec("RELATIVE_URLS", Shape::Bool, "document-relative URLs"),
    spec("LINKS", Shape::LinkList, "blogroll links"),
    spec("SOCIAL", Shape::LinkList, "social widget links"),
    spec("STATIC_PATHS", Shape::StringList, "directories copied verbatim"),
    spec("EXTRA_PATH_METADATA", Shape::PathMetadata, "per-file metadata for static files"),
    spec("DIRECT_TEMPLATES", Shape::StringList, "templates rendered without content"),
    spec("FORMATTED_FIELDS", Shape::StringList, "metadata fields rendered as markup"),
    spec("THEME", Shape::String, "theme directory"),
    spec("THEME_STATIC_DIR", Shape::String, "output directory for theme assets"),
    spec("PLUGIN_PATHS", Shape::StringList, "plugin search paths"),
    spec("PLUGINS", Shape::StringList, "enabled plugins"),
    spec("FEED_MAX_ITEMS", Shape::OptionalInt, "maximum items per feed"),
    spec("FEED_DOMAIN", Shape::OptionalString, "domain prepended to feed URLs"),
    spec("M_SITE_LOGO", Shape::String, "theme logo image"),
    spec("M_SITE_LOGO_TEXT", Shape::String, "theme logo text"),
    spec("M_THEME_COLOR", Shape::String, "browser theme color"),
    spec("M_FAVICON", Shape::StringPair, "favicon (path, MIME type)"),
    spec("M_CSS_FILES", Shape::StringList, "theme stylesheets"),
    spec("M_FINE_PRINT", Shape::String, "footer fine print"),
    spec("M_LINKS_NAVBAR1", Shape::LinkList, "left navbar links"),
    spec("M_LINKS_NAVBAR2", Shape::LinkList, "right navbar links"),
    spec("FEED_*", Shape::OptionalString, "feed output path, None disables"),
    spec("*_FEED_ATOM", Shape::OptionalString, "Atom feed path, None disables"),
    spec("*_FEED_RSS", Shape::OptionalString, "RSS feed path, None disables"),
    spec("*_SAVE_AS", Shape::String, "output path, empty string disables the page"),
    spec("*_URL", Shape::String, "URL pattern"),
    spec("M_*", Shape::Any, "theme display option"),
];

/// Errors for catalog construction
#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("Glob pattern error: {0}")]
    GlobError(#[from] globset::Error),
}

/// Lookup table of recognized settings
#[derive(Debug, Clone)]
pub struct Catalog {
    specs: Vec<SettingSpec>,
    exact: HashMap<&'static str, usize>,
    glob_set: GlobSet,
    /// GlobSet match index to index in `specs`
    glob_specs: Vec<usize>,
}

impl Catalog {
    /// Catalog of the built-in settings
    pub fn builtin() -> Result<Self, CatalogError> {
        Self::new(BUILTIN_SETTINGS.to_vec())
    }

    pub fn new(specs: Vec<SettingSpec>) -> Result<Self, CatalogError> {
        let mut exact = HashMap::new();
        let mut builder = GlobSetBuilder::new();
        let mut glob_specs = Vec::new();

        for (index, spec) in specs.iter().enumerate() {
            if spec.pattern.contains(['*', '?', '[']) {
                builder.add(Glob::new(spec.pattern)?);
                glob_specs.push(index);
            } else {
                exact.entry(spec.pattern).or_insert(index);
            }
        }

        Ok(Self {
            specs,
            exact,
            glob_set: builder.build()?,
            glob_specs,
        })
    }

    /// Find the spec governing `name`.
    pub fn lookup(&self, name: &str) -> Option<&SettingSpec> {
        if let Some(&index) = self.exact.get(name) {
            return self.specs.get(index);
        }
        self.glob_set
            .matches(name)
            .into_iter()
            .min()
            .and_then(|m| self.glob_specs.get(m))
            .and_then(|&index| self.specs.get(index))
    }

    pub fn specs(&self) -> &[SettingSpec] {
        &self.specs
    }

    /// Report every recognized setting whose value has the wrong shape.
    pub fn check(&self, config: &EffectiveConfig) -> Vec<Diagnostic> {
        config
            .iter()
            .filter_map(|(name, value)| {
                let spec = self.lookup(name)?;
                if spec.shape.matches(value) {
                    return None;
                }
                Some(Diagnostic {
                    setting: name.to_string(),
                    expected: spec.shape,
                    found: value.type_name(),
                    source: config
                        .origin_of(name)
                        .map(|s| s.label().to_string())
                        .unwrap_or_default(),
                })
            })
            .collect()
    }
}

/// A setting whose value does not have the expected shape
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Diagnostic {
    pub setting: String,
    pub expected: Shape,
    pub found: &'static str,
    /// Source that supplied the value
    pub source: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: expected {}, found {} (from {})",
            self.setting, self.expected, self.found, self.source
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigFragment;

    fn s(v: &str) -> Value {
        Value::Str(v.to_string())
    }

    fn link(label: &str, url: &str) -> Value {
        Value::Tuple(vec![s(label), s(url)])
    }

    #[test]
    fn test_lookup_exact_before_pattern() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.lookup("M_FAVICON").unwrap().shape, Shape::StringPair);
        assert_eq!(catalog.lookup("M_SOMETHING_ELSE").unwrap().shape, Shape::Any);
        assert_eq!(catalog.lookup("FEED_MAX_ITEMS").unwrap().shape, Shape::OptionalInt);
    }

    #[test]
    fn test_lookup_patterns() {
        let catalog = Catalog::builtin().unwrap();
        assert_eq!(catalog.lookup("FEED_ALL_ATOM").unwrap().pattern, "FEED_*");
        assert_eq!(catalog.lookup("CATEGORY_FEED_ATOM").unwrap().pattern, "*_FEED_ATOM");
        assert_eq!(catalog.lookup("AUTHOR_FEED_RSS").unwrap().pattern, "*_FEED_RSS");
        assert_eq!(catalog.lookup("TAGS_SAVE_AS").unwrap().pattern, "*_SAVE_AS");
        assert!(catalog.lookup("MY_PLUGIN_OPTION").is_none());
    }

    #[test]
    fn test_shapes() {
        assert!(Shape::LinkList.matches(&Value::Tuple(vec![
            link("Pelican", "https://getpelican.com/"),
            link("Python.org", "https://www.python.org/"),
        ])));
        assert!(Shape::LinkList.matches(&Value::List(vec![Value::Tuple(vec![
            s("Framework"),
            s("framework.html"),
            s(""),
            Value::List(vec![]),
        ])])));
        assert!(!Shape::LinkList.matches(&Value::List(vec![s("oops")])));
        assert!(Shape::BoolOrInt.matches(&Value::Bool(false)));
        assert!(Shape::BoolOrInt.matches(&Value::Int(10)));
        assert!(!Shape::StringPair.matches(&Value::Tuple(vec![s("a")])));
        assert!(Shape::PathMetadata.matches(&Value::Dict(vec![(
            "extra/favicon.ico".into(),
            Value::Dict(vec![("path".into(), s("favicon.ico"))]),
        )])));
    }

    #[test]
    fn test_check_reports_wrong_shapes() {
        let catalog = Catalog::builtin().unwrap();
        let config = EffectiveConfig::fold(vec![ConfigFragment::from_pairs([
            ("SITENAME", s("mi-atlas")),
            ("LINKS", s("https://getpelican.com/")),
            ("FEED_ALL_ATOM", Value::None),
            ("CUSTOM", Value::Int(3)),
            ("STATIC_PATHS", Value::List(vec![s("extra"), Value::Int(1)])),
        ])]);

        let diagnostics = catalog.check(&config);
        assert_eq!(diagnostics.len(), 2);
        assert_eq!(diagnostics[0].setting, "LINKS");
        assert_eq!(diagnostics[0].found, "str");
        assert_eq!(
            diagnostics[0].to_string(),
            "LINKS: expected sequence of (label, URL) pairs, found str (from memory)"
        );
        assert_eq!(diagnostics[1].setting, "STATIC_PATHS");
    }
}
