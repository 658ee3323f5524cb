/*!
 * Rule-based password candidate generation
 *
 * Seed words are expanded in three stages:
 * - substring modifications (`o` -> `0`, ...) each followed by basic case variants
 * - per-character substitutions combined with per-character capitalization
 * - two-word combinations with paddings, connectors and years
 *
 * Every stage keeps the order in which candidates were first generated.
 */

use std::collections::{HashMap, HashSet};
use std::hash::Hash;

use crate::config::{Modification, WordTransformRules};
use crate::progress::ProgressReporter;

/// Deduplicating collection that iterates in insertion order
#[derive(Debug, Clone)]
pub struct OrderedSet<T> {
    items: Vec<T>,
    seen: HashSet<T>,
}

impl<T: Eq + Hash + Clone> OrderedSet<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            seen: HashSet::new(),
        }
    }

    /// Returns false when the value was already present
    pub fn insert(&mut self, value: T) -> bool {
        if self.seen.contains(&value) {
            return false;
        }
        self.seen.insert(value.clone());
        self.items.push(value);
        true
    }

    pub fn contains(&self, value: &T) -> bool {
        self.seen.contains(value)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn into_vec(self) -> Vec<T> {
        self.items
    }
}

impl<T: Eq + Hash + Clone> Default for OrderedSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Eq + Hash + Clone> Extend<T> for OrderedSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        for value in iter {
            self.insert(value);
        }
    }
}

impl<T: Eq + Hash + Clone> FromIterator<T> for OrderedSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.extend(iter);
        set
    }
}

/// `[word, UPPER, lower, First+rest lower, First+rest unchanged]`
///
/// Always five entries, duplicates included. An empty word yields five empty strings.
pub fn basic_case_variants(word: &str) -> [String; 5] {
    let mut chars = word.chars();
    let (first_upper, rest) = match chars.next() {
        Some(first) => (first.to_uppercase().collect::<String>(), chars.as_str()),
        None => (String::new(), ""),
    };

    [
        word.to_string(),
        word.to_uppercase(),
        word.to_lowercase(),
        format!("{}{}", first_upper, rest.to_lowercase()),
        format!("{}{}", first_upper, rest),
    ]
}

/// Basic case variants of the word and of each applicable modification
///
/// A modification applies when its search string occurs in the word ignoring
/// case; the replacement itself is case-sensitive and replaces every occurrence.
pub fn modified_variants(word: &str, modifications: &[Modification]) -> Vec<String> {
    let lowered = word.to_lowercase();
    let bases = std::iter::once(word.to_string()).chain(
        modifications
            .iter()
            .filter(|m| !m.find.is_empty() && lowered.contains(&m.find.to_lowercase()))
            .map(|m| word.replace(&m.find, &m.replace)),
    );

    bases
        .flat_map(|base| basic_case_variants(&base))
        .collect::<OrderedSet<_>>()
        .into_vec()
}

/// Every combination of per-character substitutions and capitalizations
///
/// Each position starts with the character itself followed by its
/// substitutions. The first position (every position unless
/// `capitalize_first_only`) additionally gets each of those strings with one
/// character upper-cased. Combinations are enumerated with the last position
/// varying fastest.
pub fn leet_and_case_variants(
    word: &str,
    substitutions: &HashMap<char, Vec<String>>,
    capitalize_first_only: bool,
) -> Vec<String> {
    let mut terms: Vec<Vec<String>> = word
        .chars()
        .map(|ch| {
            let mut options = vec![ch.to_string()];
            if let Some(alternatives) = substitutions.get(&ch) {
                options.extend(alternatives.iter().cloned());
            }
            options
        })
        .collect();

    for (index, options) in terms.iter_mut().enumerate() {
        if capitalize_first_only && index > 0 {
            break;
        }
        let capitalized: OrderedSet<String> = options
            .iter()
            .flat_map(|option| single_capitalizations(option))
            .collect();
        // Duplicates of existing options are kept; the product is deduplicated
        options.extend(capitalized.into_vec());
    }

    cartesian_product(&terms)
}

/// One copy of `text` per character, with only that character upper-cased
fn single_capitalizations(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    (0..chars.len())
        .map(|i| {
            chars
                .iter()
                .enumerate()
                .flat_map(|(j, ch)| {
                    if i == j {
                        ch.to_uppercase().collect::<Vec<_>>()
                    } else {
                        vec![*ch]
                    }
                })
                .collect()
        })
        .collect()
}

/// Mixed-radix enumeration, last position fastest
fn cartesian_product(terms: &[Vec<String>]) -> Vec<String> {
    let mut result = OrderedSet::new();
    if terms.iter().any(|options| options.is_empty()) {
        return Vec::new();
    }

    let mut indices = vec![0usize; terms.len()];
    loop {
        let combination: String = terms
            .iter()
            .zip(&indices)
            .map(|(options, &i)| options[i].as_str())
            .collect();
        result.insert(combination);

        let mut position = terms.len();
        loop {
            if position == 0 {
                return result.into_vec();
            }
            position -= 1;
            if indices[position] + 1 < terms[position].len() {
                indices[position] += 1;
                break;
            }
            indices[position] = 0;
        }
    }
}

/// All case, modification and substitution variants of one seed word
pub fn word_variants(word: &str, rules: &WordTransformRules) -> Vec<String> {
    modified_variants(word, &rules.modifications)
        .iter()
        .flat_map(|modified| {
            leet_and_case_variants(modified, &rules.substitutions, rules.capitalize_first_only)
        })
        .collect::<OrderedSet<_>>()
        .into_vec()
}

/// Candidate passwords built from two seed words
///
/// The years are appended to the first word's variants only. A candidate is
/// `prefix + a + connector + b + suffix` (the connector and `b` are left out
/// when `b` is blank); its mirror with `a` and `b` swapped is emitted
/// alongside whenever `a != b`. Only candidates whose length lies within
/// `[min_length, max_length]` are kept.
pub fn generate_combinations(
    word1: &str,
    word2: &str,
    rules: &WordTransformRules,
    progress: &dyn ProgressReporter,
) -> Vec<String> {
    let second = word_variants(word2, rules);
    let mut first = if word1 == word2 {
        second.clone()
    } else {
        word_variants(word1, rules)
    };
    first.extend(rules.all_years());

    let total = (rules.paddings.len()
        * first.len()
        * rules.connectors.len()
        * second.len()
        * rules.paddings.len()) as u64;
    progress.set_total_ticks(total);

    let mut candidates = OrderedSet::new();
    let mut ticks = 0u64;
    for prefix in &rules.paddings {
        for a in &first {
            for connector in &rules.connectors {
                for b in &second {
                    for suffix in &rules.paddings {
                        let p1 = join(prefix, a, connector, b, suffix);
                        let length = p1.chars().count();
                        if length >= rules.min_length && length <= rules.max_length {
                            candidates.insert(p1);
                            if a != b {
                                candidates.insert(join(prefix, b, connector, a, suffix));
                            }
                        }
                        ticks += 1;
                    }
                }
            }
            progress.report(ticks, &format!("{}{}...", prefix, a));
        }
    }
    progress.report(total, "Completed");

    candidates.into_vec()
}

fn join(prefix: &str, a: &str, connector: &str, b: &str, suffix: &str) -> String {
    if b.trim().is_empty() {
        format!("{}{}{}", prefix, a, suffix)
    } else {
        format!("{}{}{}{}{}", prefix, a, connector, b, suffix)
    }
}
