//! Configuration errors

use siteconf_syntax::SyntaxError;

/// Errors raised while resolving configuration fragments.
///
/// Resolution either succeeds completely or fails with the first error;
/// there is no partial result.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A listed source could not be read.
    #[error("config source not found: {location}: {reason}")]
    SourceNotFound { location: String, reason: String },

    /// A source was read but its contents are not a flat mapping of
    /// setting names to values.
    #[error("failed to parse {}: {message}", position(.location, .line, .column))]
    ParseError {
        location: String,
        line: Option<usize>,
        column: Option<usize>,
        message: String,
    },

    /// The effective configuration does not fit the typed settings view.
    #[error("invalid settings: {0}")]
    InvalidSettings(#[from] serde_json::Error),
}

impl ConfigError {
    pub(crate) fn not_found(location: impl Into<String>, reason: impl ToString) -> Self {
        Self::SourceNotFound {
            location: location.into(),
            reason: reason.to_string(),
        }
    }

    pub(crate) fn parse(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ParseError {
            location: location.into(),
            line: None,
            column: None,
            message: message.into(),
        }
    }

    pub(crate) fn parse_at(
        location: impl Into<String>,
        line: usize,
        column: usize,
        message: impl Into<String>,
    ) -> Self {
        Self::ParseError {
            location: location.into(),
            line: Some(line),
            column: Some(column),
            message: message.into(),
        }
    }

    pub(crate) fn syntax(location: impl Into<String>, err: SyntaxError) -> Self {
        Self::parse_at(location, err.line, err.column, err.message)
    }

    /// The source identifier the error refers to, if any.
    pub fn location(&self) -> Option<&str> {
        match self {
            ConfigError::SourceNotFound { location, .. }
            | ConfigError::ParseError { location, .. } => Some(location),
            ConfigError::InvalidSettings(_) => None,
        }
    }
}

fn position(location: &str, line: &Option<usize>, column: &Option<usize>) -> String {
    match (line, column) {
        (Some(line), Some(column)) => format!("{}:{}:{}", location, line, column),
        (Some(line), None) => format!("{}:{}", location, line),
        _ => location.to_string(),
    }
}
