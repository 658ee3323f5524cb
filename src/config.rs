/*!
 * Word transformation rules
 *
 * One immutable bundle per run: seed words, paddings, years, connectors,
 * length bounds and the two transformation tables. Loaded from JSON, every
 * field optional.
 */

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Substring replacement applied before case and substitution expansion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modification {
    pub find: String,
    pub replace: String,
}

impl Modification {
    pub fn new(find: impl Into<String>, replace: impl Into<String>) -> Self {
        Self {
            find: find.into(),
            replace: replace.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WordTransformRules {
    /// Seed words, paired with each other by the dictionary attack
    pub words: Vec<String>,
    /// Used both as prefixes and as suffixes
    pub paddings: Vec<String>,
    pub years: Vec<String>,
    /// Inclusive `start-end`, e.g. `1990-1995`
    pub years_range: Option<String>,
    /// Placed between the two words of a candidate
    pub connectors: Vec<String>,
    pub min_length: usize,
    pub max_length: usize,
    pub capitalize_first_only: bool,
    /// Applied in list order
    pub modifications: Vec<Modification>,
    pub substitutions: HashMap<char, Vec<String>>,
}

impl Default for WordTransformRules {
    fn default() -> Self {
        Self {
            words: Vec::new(),
            paddings: vec![String::new()],
            years: Vec::new(),
            years_range: None,
            connectors: vec![String::new()],
            min_length: 8,
            max_length: 10,
            capitalize_first_only: false,
            modifications: Vec::new(),
            substitutions: HashMap::new(),
        }
    }
}

impl WordTransformRules {
    /// Load and validate rules from a JSON file
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let rules: WordTransformRules = serde_json::from_str(&json)?;
        rules.validate()?;
        debug!(
            path = %path.display(),
            words = rules.words.len(),
            modifications = rules.modifications.len(),
            substitutions = rules.substitutions.len(),
            "loaded word transformation rules"
        );
        Ok(rules)
    }

    pub fn validate(&self) -> Result<()> {
        if self.min_length > self.max_length {
            return Err(Error::InvalidConfig(format!(
                "min_length {} is greater than max_length {}",
                self.min_length, self.max_length
            )));
        }
        if self.paddings.is_empty() {
            return Err(Error::InvalidConfig(
                "paddings must contain at least one entry (use \"\" for none)".to_string(),
            ));
        }
        if self.connectors.is_empty() {
            return Err(Error::InvalidConfig(
                "connectors must contain at least one entry (use \"\" for none)".to_string(),
            ));
        }
        if self.modifications.iter().any(|m| m.find.is_empty()) {
            return Err(Error::InvalidConfig(
                "modification with an empty search string".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured years followed by the expanded years range, without repeats
    pub fn all_years(&self) -> Vec<String> {
        let mut years = self.years.clone();
        if let Some(range) = &self.years_range {
            for year in parse_years_range(range) {
                if !years.contains(&year) {
                    years.push(year);
                }
            }
        }
        years
    }
}

/// Expand `start-end` into every year of the inclusive range
///
/// Blank or unparsable ranges expand to nothing, as does `start > end`.
pub fn parse_years_range(range: &str) -> Vec<String> {
    let parts: Vec<&str> = range.split('-').collect();
    let [start, end] = parts.as_slice() else {
        return Vec::new();
    };
    match (start.trim().parse::<i32>(), end.trim().parse::<i32>()) {
        (Ok(start), Ok(end)) => (start..=end).map(|year| year.to_string()).collect(),
        _ => Vec::new(),
    }
}
