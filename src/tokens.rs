//! Nourish - Multi-value field parsing
//!
//! Health flags and key nutrients are stored as comma-delimited text in the
//! catalog but behave as sets everywhere else. They are parsed once, at load
//! time, into a [`TokenSet`] and never re-split inside filter or aggregate code.

use serde::Serialize;
use std::collections::BTreeSet;

/// Delimiter between tokens in a raw multi-value cell.
pub const TOKEN_DELIMITER: char = ',';

/// A set of trimmed, non-empty tokens. Case is preserved.
///
/// Backed by a `BTreeSet` so iteration (and therefore every rendering of the
/// set) is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct TokenSet(BTreeSet<String>);

impl TokenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw delimited cell. Absent input yields the empty set.
    pub fn parse(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::default();
        };

        raw.split(TOKEN_DELIMITER)
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// Insert a single token, trimming it first. Empty tokens are ignored.
    pub fn insert(&mut self, token: &str) -> bool {
        let token = token.trim();
        if token.is_empty() {
            return false;
        }
        self.0.insert(token.to_string())
    }

    pub fn contains(&self, token: &str) -> bool {
        self.0.contains(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// True when the two sets share at least one token.
    pub fn intersects(&self, other: &TokenSet) -> bool {
        // Probe the smaller set against the larger one.
        let (small, large) = if self.len() <= other.len() {
            (self, other)
        } else {
            (other, self)
        };
        small.iter().any(|token| large.contains(token))
    }

    /// Add every token of `other` to this set.
    pub fn extend_from(&mut self, other: &TokenSet) {
        self.0.extend(other.0.iter().cloned());
    }

    pub fn is_superset(&self, other: &TokenSet) -> bool {
        self.0.is_superset(&other.0)
    }

    /// Render the set back into delimited text (`", "` between tokens).
    pub fn join(&self) -> String {
        self.0
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.0.iter().cloned().collect()
    }
}

impl FromIterator<String> for TokenSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        let mut set = TokenSet::default();
        for token in iter {
            set.insert(&token);
        }
        set
    }
}

impl<'a> FromIterator<&'a str> for TokenSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = TokenSet::default();
        for token in iter {
            set.insert(token);
        }
        set
    }
}

impl<'a> IntoIterator for &'a TokenSet {
    type Item = &'a String;
    type IntoIter = std::collections::btree_set::Iter<'a, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Split a delimited multi-value field into its token set.
pub fn parse_tokens(raw: Option<&str>) -> TokenSet {
    TokenSet::parse(raw)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_and_drops_empty() {
        let set = parse_tokens(Some(" PCOS ,Menopause,, ,Endometriosis "));
        assert_eq!(set.len(), 3);
        assert!(set.contains("PCOS"));
        assert!(set.contains("Menopause"));
        assert!(set.contains("Endometriosis"));
    }

    #[test]
    fn test_parse_absent_and_blank() {
        assert!(parse_tokens(None).is_empty());
        assert!(parse_tokens(Some("")).is_empty());
        assert!(parse_tokens(Some(" , ,")).is_empty());
    }

    #[test]
    fn test_parse_dedups_and_preserves_case() {
        let set = parse_tokens(Some("Iron, iron, Iron"));
        assert_eq!(set.len(), 2);
        assert!(set.contains("Iron"));
        assert!(set.contains("iron"));
    }

    #[test]
    fn test_parse_is_idempotent_over_join() {
        let inputs = [
            "Omega-3, Vitamin D, Selenium",
            "  Magnesium ,, Fiber,Magnesium",
            "",
            "Single",
        ];
        for raw in inputs {
            let first = parse_tokens(Some(raw));
            let second = parse_tokens(Some(&first.join()));
            assert_eq!(first, second, "round trip changed set for {:?}", raw);
        }
    }

    #[test]
    fn test_intersects() {
        let a = parse_tokens(Some("PCOS, Menopause"));
        let b = parse_tokens(Some("Menopause"));
        let c = parse_tokens(Some("Fertility"));
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
        assert!(!a.intersects(&c));
        assert!(!a.intersects(&TokenSet::new()));
    }
}
