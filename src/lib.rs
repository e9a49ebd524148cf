//! siteconf - layered settings resolver for static-site generators
//!
//! Reads an ordered list of settings files (a base file plus
//! environment-specific overrides), folds them into one effective
//! configuration where later files win, and hands the result to the site
//! generator as JSON, TOML or a settings file.

pub mod catalog;
pub mod config;
pub mod logging;
pub mod settings;

pub use catalog::{Catalog, Diagnostic, Shape};
pub use config::{
    load, ConfigError, ConfigFragment, ConfigResolver, ConfigSource, EffectiveConfig, OutputFormat,
};
pub use settings::SiteSettings;
pub use siteconf_syntax::Value;
