//! Layered resolution of configuration sources
//!
//! Layers, lowest precedence first:
//! 1. Files collected from a fragment directory, in file-name order
//! 2. Explicit sources, in the order given
//! 3. Command-line overrides (`NAME=literal`)
//!
//! Every fragment is parsed with the settings resolved so far in scope, so
//! an override file may refer to names its base file defines.

use siteconf_syntax::{is_identifier, parse_expression};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::effective::EffectiveConfig;
use super::error::ConfigError;
use super::fragment::{ConfigFragment, ConfigSource};
use super::merge::Merged;

/// Extensions collected from a fragment directory
const FRAGMENT_EXTENSIONS: &[&str] = &["py", "toml", "json"];

/// Resolve an ordered list of sources, earliest = lowest priority.
pub fn load<P: AsRef<Path>>(sources: &[P]) -> Result<EffectiveConfig, ConfigError> {
    let mut resolver = ConfigResolver::new();
    for source in sources {
        resolver = resolver.source(source);
    }
    resolver.resolve()
}

/// Builder for a layered resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigResolver {
    dir: Option<PathBuf>,
    sources: Vec<PathBuf>,
    overrides: Vec<(String, String)>,
}

impl ConfigResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a source file.
    pub fn source(mut self, path: impl AsRef<Path>) -> Self {
        self.sources.push(path.as_ref().to_path_buf());
        self
    }

    /// Collect fragments from a directory ahead of explicit sources.
    pub fn dir(mut self, path: impl AsRef<Path>) -> Self {
        self.dir = Some(path.as_ref().to_path_buf());
        self
    }

    /// Add a `NAME = literal` override applied after every file.
    pub fn with_override(mut self, name: impl Into<String>, literal: impl Into<String>) -> Self {
        self.overrides.push((name.into(), literal.into()));
        self
    }

    /// Add an override given as `NAME=literal`.
    pub fn with_override_spec(self, spec: &str) -> Result<Self, ConfigError> {
        let (name, literal) = split_override(spec)?;
        Ok(self.with_override(name, literal))
    }

    /// The ordered file list this resolver will read.
    pub fn source_paths(&self) -> Result<Vec<PathBuf>, ConfigError> {
        let mut paths = match &self.dir {
            Some(dir) => collect_dir(dir)?,
            None => Vec::new(),
        };
        paths.extend(self.sources.iter().cloned());
        Ok(paths)
    }

    /// Read, parse and fold every layer.
    pub fn resolve(&self) -> Result<EffectiveConfig, ConfigError> {
        let paths = self.source_paths()?;
        let mut merged = Merged::default();

        for path in &paths {
            let fragment = ConfigFragment::load(path, &merged.settings)?;
            debug!(
                path = %path.display(),
                settings = fragment.len(),
                "folding config fragment"
            );
            merged.apply(fragment);
        }

        if !self.overrides.is_empty() {
            let fragment = self.override_fragment(&merged)?;
            debug!(settings = fragment.len(), "folding command-line overrides");
            merged.apply(fragment);
        }

        let config = EffectiveConfig::from_merged(merged);
        info!(
            sources = config.sources().len(),
            settings = config.len(),
            "resolved effective configuration"
        );
        Ok(config)
    }

    fn override_fragment(&self, merged: &Merged) -> Result<ConfigFragment, ConfigError> {
        let source = ConfigSource::cli();
        let location = source.label().to_string();
        let mut fragment = ConfigFragment::new(source);
        for (name, literal) in &self.overrides {
            if !is_identifier(name) {
                return Err(ConfigError::parse(
                    &location,
                    format!("'{}' is not a valid setting name", name),
                ));
            }
            let value = parse_expression(literal, &merged.settings).map_err(|e| {
                ConfigError::parse(&location, format!("{}: {}", name, e))
            })?;
            fragment.insert(name.clone(), value);
        }
        Ok(fragment)
    }
}

/// Split `NAME=literal` at the first `=`.
pub fn split_override(spec: &str) -> Result<(String, String), ConfigError> {
    match spec.split_once('=') {
        Some((name, literal)) => Ok((name.trim().to_string(), literal.trim().to_string())),
        None => Err(ConfigError::parse(
            "cli",
            format!("override '{}' must have the form NAME=literal", spec),
        )),
    }
}

/// Fragment files directly inside `dir`, sorted by file name.
fn collect_dir(dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let location = dir.display().to_string();
    if !dir.is_dir() {
        return Err(ConfigError::not_found(&location, "not a directory"));
    }

    let mut paths = Vec::new();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = entry.map_err(|e| ConfigError::not_found(&location, e))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let recognized = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| {
                FRAGMENT_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if recognized {
            paths.push(entry.into_path());
        } else {
            debug!(path = %entry.path().display(), "skipping non-fragment file");
        }
    }
    Ok(paths)
}
