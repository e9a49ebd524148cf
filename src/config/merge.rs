//! Configuration merge logic
//!
//! Fragments are folded left to right:
//! - Each setting in a later fragment replaces the earlier value wholesale
//!   (dicts and lists are not merged)
//! - Settings no fragment defines stay absent
//! - `None` is a value like any other and overrides

use siteconf_syntax::Value;
use std::collections::BTreeMap;

use super::fragment::{ConfigFragment, ConfigSource};

/// Accumulated result of folding fragments.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Merged {
    pub settings: BTreeMap<String, Value>,
    /// Setting name to index into `sources` of the fragment that supplied it
    pub provenance: BTreeMap<String, usize>,
    /// Contributing sources in precedence order
    pub sources: Vec<ConfigSource>,
}

impl Merged {
    /// Overlay one fragment on top of the accumulator.
    pub fn apply(&mut self, fragment: ConfigFragment) {
        let index = self.sources.len();
        let (source, settings) = fragment.into_parts();
        self.sources.push(source);
        for (name, value) in settings {
            self.provenance.insert(name.clone(), index);
            self.settings.insert(name, value);
        }
    }
}

/// Merge fragments in order (first is base, last has highest precedence)
pub fn merge_fragments(fragments: impl IntoIterator<Item = ConfigFragment>) -> Merged {
    fragments
        .into_iter()
        .fold(Merged::default(), |mut acc, fragment| {
            acc.apply(fragment);
            acc
        })
}
