//! Nourish - Filter engine
//!
//! A [`FilterCriteria`] is rebuilt from user input on every query. Its four
//! dimensions (category, flag, score, text) combine with AND; values inside a
//! multi-valued dimension combine with OR. Every dimension left empty imposes
//! no restriction, so filtering is total over any criteria.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

use crate::model::FoodItem;
use crate::rank::sort_items;
use crate::tokens::TokenSet;

/// Result ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortKey {
    /// Highest score first
    #[default]
    ScoreDesc,
    /// Lowest score first
    ScoreAsc,
    /// Alphabetical by name, case-insensitive
    NameAsc,
}

impl SortKey {
    pub const ALL: [SortKey; 3] = [SortKey::ScoreDesc, SortKey::ScoreAsc, SortKey::NameAsc];

    /// Parse a sort key from its id or its dashboard label
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "score-desc" | "desc" | "highest score" => Some(SortKey::ScoreDesc),
            "score-asc" | "asc" | "lowest score" => Some(SortKey::ScoreAsc),
            "name-asc" | "name" | "alpha_asc" | "alphabetical (a-z)" => Some(SortKey::NameAsc),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SortKey::ScoreDesc => "score-desc",
            SortKey::ScoreAsc => "score-asc",
            SortKey::NameAsc => "name-asc",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SortKey::ScoreDesc => "Highest Score",
            SortKey::ScoreAsc => "Lowest Score",
            SortKey::NameAsc => "Alphabetical (A-Z)",
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SortKey::parse(s).ok_or_else(|| {
            format!(
                "unknown sort key '{}' (expected one of: {})",
                s,
                SortKey::ALL.map(|k| k.as_str()).join(", ")
            )
        })
    }
}

/// Query configuration
#[derive(Debug, Clone, PartialEq)]
pub struct FilterCriteria {
    /// Categories to include; empty means any
    pub categories: BTreeSet<String>,
    /// Health flags to include (OR); empty means any
    pub flags: TokenSet,
    /// Inclusive lower score bound; unscored items never pass it
    pub min_score: f64,
    /// Case-insensitive substring over name, mechanism, nutrients and flags
    pub search_text: String,
    pub sort_key: SortKey,
}

impl Default for FilterCriteria {
    fn default() -> Self {
        Self {
            categories: BTreeSet::new(),
            flags: TokenSet::default(),
            min_score: 0.0,
            search_text: String::new(),
            sort_key: SortKey::default(),
        }
    }
}

impl FilterCriteria {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_category(mut self, category: &str) -> Self {
        let category = category.trim();
        if !category.is_empty() {
            self.categories.insert(category.to_string());
        }
        self
    }

    pub fn with_categories<I, S>(self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        categories
            .into_iter()
            .fold(self, |criteria, c| criteria.with_category(c.as_ref()))
    }

    pub fn with_flag(mut self, flag: &str) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_flags<I, S>(self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        flags
            .into_iter()
            .fold(self, |criteria, f| criteria.with_flag(f.as_ref()))
    }

    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.min_score = min_score;
        self
    }

    pub fn with_search(mut self, text: &str) -> Self {
        self.search_text = text.to_string();
        self
    }

    pub fn with_sort(mut self, key: SortKey) -> Self {
        self.sort_key = key;
        self
    }

    /// Lower-cased needle, or `None` when search is blank
    fn needle(&self) -> Option<String> {
        let text = self.search_text.trim();
        (!text.is_empty()).then(|| text.to_lowercase())
    }

    /// Whether `item` passes all four dimensions
    pub fn matches(&self, item: &FoodItem) -> bool {
        self.matches_with(item, self.needle().as_deref())
    }

    fn matches_with(&self, item: &FoodItem, needle: Option<&str>) -> bool {
        matches_category(item, &self.categories)
            && matches_flags(item, &self.flags)
            && matches_score(item, self.min_score)
            && needle.map_or(true, |n| matches_search(item, n))
    }

    /// Category and flag values that never occur in the catalog.
    ///
    /// Such values are not errors: they simply match nothing.
    pub fn unknown_values(&self, vocabulary: &Vocabulary) -> Vec<UnknownValue> {
        let categories = self
            .categories
            .iter()
            .filter(|c| !vocabulary.categories.contains(*c))
            .map(|c| UnknownValue::Category(c.clone()));
        let flags = self
            .flags
            .iter()
            .filter(|f| !vocabulary.flags.contains(f))
            .map(|f| UnknownValue::Flag(f.to_string()));
        categories.chain(flags).collect()
    }
}

/// A criteria value absent from the catalog vocabulary
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnknownValue {
    Category(String),
    Flag(String),
}

impl fmt::Display for UnknownValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnknownValue::Category(c) => write!(f, "category '{}'", c),
            UnknownValue::Flag(flag) => write!(f, "flag '{}'", flag),
        }
    }
}

fn matches_category(item: &FoodItem, categories: &BTreeSet<String>) -> bool {
    if categories.is_empty() {
        return true;
    }
    item.category
        .as_ref()
        .map_or(false, |category| categories.contains(category))
}

fn matches_flags(item: &FoodItem, flags: &TokenSet) -> bool {
    flags.is_empty() || item.flags.intersects(flags)
}

fn matches_score(item: &FoodItem, min_score: f64) -> bool {
    item.score.map_or(false, |score| score.value() >= min_score)
}

fn matches_search(item: &FoodItem, needle: &str) -> bool {
    item.search_haystacks()
        .any(|text| text.to_lowercase().contains(needle))
}

/// Keep the items that satisfy `criteria`, in input order.
pub fn apply_filters<'a>(items: &'a [FoodItem], criteria: &FilterCriteria) -> Vec<&'a FoodItem> {
    let needle = criteria.needle();
    let filtered: Vec<&FoodItem> = items
        .iter()
        .filter(|item| criteria.matches_with(item, needle.as_deref()))
        .collect();

    debug!(
        "Filter kept {} of {} items (categories={}, flags={}, min_score={}, search={:?})",
        filtered.len(),
        items.len(),
        criteria.categories.len(),
        criteria.flags.len(),
        criteria.min_score,
        needle
    );
    filtered
}

/// Filter, then order by `criteria.sort_key`.
pub fn query<'a>(items: &'a [FoodItem], criteria: &FilterCriteria) -> Vec<&'a FoodItem> {
    let mut results = apply_filters(items, criteria);
    sort_items(&mut results, criteria.sort_key);
    results
}

/// Filterable values present in a catalog
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Vocabulary {
    pub categories: BTreeSet<String>,
    pub flags: TokenSet,
    pub nutrients: TokenSet,
}

impl Vocabulary {
    pub fn from_items(items: &[FoodItem]) -> Self {
        let mut vocabulary = Vocabulary::default();
        for item in items {
            if let Some(category) = &item.category {
                vocabulary.categories.insert(category.clone());
            }
            vocabulary.flags.extend_from(&item.flags);
            vocabulary.nutrients.extend_from(&item.nutrients);
        }
        vocabulary
    }
}
