//! Plain-text identifier scanner.
//!
//! Matches are anchored at the character level only, so an ID embedded in a
//! longer token (`XT1566Y`, a URL slug) still matches when it is a catalog key.

use crate::domain::model::{Catalog, FoundIdentifiers};
use regex::Regex;
use std::sync::LazyLock;

pub static TECHNIQUE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"T\d{4}(?:\.\d{3})?").expect("technique pattern is valid"));

pub static TACTIC_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"TA\d{4}").expect("tactic pattern is valid"));

pub fn scan_text(text: &str, catalog: &Catalog) -> FoundIdentifiers {
    FoundIdentifiers {
        techniques: TECHNIQUE_PATTERN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|id| catalog.has_technique(id))
            .map(str::to_string)
            .collect(),
        tactics: TACTIC_PATTERN
            .find_iter(text)
            .map(|m| m.as_str())
            .filter(|id| catalog.has_tactic(id))
            .map(str::to_string)
            .collect(),
    }
}
