//! Configuration resolution
//!
//! Folds an ordered list of configuration fragments into one effective
//! configuration:
//! 1. Fragment directory (`--dir`), in file-name order
//! 2. Explicit source files, in the order given
//! 3. Command-line overrides (`--set NAME=literal`)
//!
//! Later fragments override earlier settings of the same name.

mod effective;
mod error;
mod fragment;
mod merge;
mod render;
mod resolver;

pub use effective::{EffectiveConfig, SCHEMA_ID};
pub use error::ConfigError;
pub use fragment::{ConfigFragment, ConfigOrigin, ConfigSource, FragmentFormat};
pub use merge::{merge_fragments, Merged};
pub use render::OutputFormat;
pub use resolver::{load, split_override, ConfigResolver};
