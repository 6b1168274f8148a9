//! Nourish - Catalog data model

use serde::Serialize;
use std::fmt;

use crate::tokens::TokenSet;

/// Placeholder rendered for any descriptive field the catalog does not supply.
pub const NOT_AVAILABLE: &str = "N/A";

/// Anti-inflammatory score, always within `[Score::MIN, Score::MAX]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct Score(f64);

impl Score {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 10.0;

    /// Returns `None` for non-finite or out-of-range values.
    pub fn new(value: f64) -> Option<Self> {
        if value.is_finite() && (Self::MIN..=Self::MAX).contains(&value) {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.fract() == 0.0 {
            write!(f, "{}", self.0 as i64)
        } else {
            write!(f, "{:.1}", self.0)
        }
    }
}

/// Free-text fields of a [`FoodItem`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextField {
    SubCategory,
    ScoreJustification,
    Mechanism,
    BestForm,
    BestFor,
    Recipe,
    Cautions,
    Regional,
}

impl TextField {
    pub const ALL: [TextField; 8] = [
        TextField::SubCategory,
        TextField::ScoreJustification,
        TextField::Mechanism,
        TextField::BestForm,
        TextField::BestFor,
        TextField::Recipe,
        TextField::Cautions,
        TextField::Regional,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TextField::SubCategory => "Sub-category",
            TextField::ScoreJustification => "Score Justification",
            TextField::Mechanism => "Why Anti-Inflammatory",
            TextField::BestForm => "Best Type/Form",
            TextField::BestFor => "Best For",
            TextField::Recipe => "Sample Recipe/Usage",
            TextField::Cautions => "Cautions",
            TextField::Regional => "Regional Availability",
        }
    }
}

/// One row of the food catalog.
///
/// `name` is the unique key used for plan membership and lookup. Optional
/// values are `None` when the source row (or the whole column) lacks them;
/// [`FoodItem::text`] substitutes [`NOT_AVAILABLE`] for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FoodItem {
    pub name: String,
    pub category: Option<String>,
    pub sub_category: Option<String>,
    pub score: Option<Score>,
    pub score_justification: Option<String>,
    pub mechanism: Option<String>,
    /// Raw flags cell, kept for free-text search.
    #[serde(skip)]
    pub flags_raw: Option<String>,
    pub flags: TokenSet,
    /// Raw nutrients cell, kept for free-text search.
    #[serde(skip)]
    pub nutrients_raw: Option<String>,
    pub nutrients: TokenSet,
    pub best_form: Option<String>,
    pub best_for: Option<String>,
    pub recipe: Option<String>,
    pub cautions: Option<String>,
    pub regional: Option<String>,
}

impl FoodItem {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: None,
            sub_category: None,
            score: None,
            score_justification: None,
            mechanism: None,
            flags_raw: None,
            flags: TokenSet::default(),
            nutrients_raw: None,
            nutrients: TokenSet::default(),
            best_form: None,
            best_for: None,
            recipe: None,
            cautions: None,
            regional: None,
        }
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Set the score. Out-of-range values leave the item unscored.
    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Score::new(score);
        self
    }

    pub fn with_flags(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.flags = TokenSet::parse(Some(&raw));
        self.flags_raw = Some(raw);
        self
    }

    pub fn with_nutrients(mut self, raw: impl Into<String>) -> Self {
        let raw = raw.into();
        self.nutrients = TokenSet::parse(Some(&raw));
        self.nutrients_raw = Some(raw);
        self
    }

    pub fn with_text(mut self, field: TextField, value: impl Into<String>) -> Self {
        *self.text_slot(field) = Some(value.into());
        self
    }

    /// The stored value of a free-text field, if any.
    pub fn text_opt(&self, field: TextField) -> Option<&str> {
        match field {
            TextField::SubCategory => self.sub_category.as_deref(),
            TextField::ScoreJustification => self.score_justification.as_deref(),
            TextField::Mechanism => self.mechanism.as_deref(),
            TextField::BestForm => self.best_form.as_deref(),
            TextField::BestFor => self.best_for.as_deref(),
            TextField::Recipe => self.recipe.as_deref(),
            TextField::Cautions => self.cautions.as_deref(),
            TextField::Regional => self.regional.as_deref(),
        }
    }

    /// A free-text field for display, with the placeholder when absent.
    pub fn text(&self, field: TextField) -> &str {
        self.text_opt(field).unwrap_or(NOT_AVAILABLE)
    }

    pub fn category_or_placeholder(&self) -> &str {
        self.category.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn score_label(&self) -> String {
        self.score
            .map(|s| s.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub(crate) fn text_slot(&mut self, field: TextField) -> &mut Option<String> {
        match field {
            TextField::SubCategory => &mut self.sub_category,
            TextField::ScoreJustification => &mut self.score_justification,
            TextField::Mechanism => &mut self.mechanism,
            TextField::BestForm => &mut self.best_form,
            TextField::BestFor => &mut self.best_for,
            TextField::Recipe => &mut self.recipe,
            TextField::Cautions => &mut self.cautions,
            TextField::Regional => &mut self.regional,
        }
    }

    /// Texts scanned by free-text search: name, mechanism, nutrients, flags.
    pub fn search_haystacks(&self) -> impl Iterator<Item = &str> {
        [
            Some(self.name.as_str()),
            self.mechanism.as_deref(),
            self.nutrients_raw.as_deref(),
            self.flags_raw.as_deref(),
        ]
        .into_iter()
        .flatten()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_bounds() {
        assert!(Score::new(0.0).is_some());
        assert!(Score::new(10.0).is_some());
        assert!(Score::new(7.5).is_some());
        assert!(Score::new(-0.1).is_none());
        assert!(Score::new(10.5).is_none());
        assert!(Score::new(f64::NAN).is_none());
    }

    #[test]
    fn test_score_display() {
        assert_eq!(Score::new(8.0).unwrap().to_string(), "8");
        assert_eq!(Score::new(8.5).unwrap().to_string(), "8.5");
    }

    #[test]
    fn test_placeholder_for_missing_text() {
        let item = FoodItem::new("Turmeric").with_text(TextField::Recipe, "Golden milk");
        assert_eq!(item.text(TextField::Recipe), "Golden milk");
        assert_eq!(item.text(TextField::Cautions), NOT_AVAILABLE);
        assert_eq!(item.category_or_placeholder(), NOT_AVAILABLE);
        assert_eq!(item.score_label(), NOT_AVAILABLE);
    }

    #[test]
    fn test_with_flags_parses_tokens() {
        let item = FoodItem::new("Salmon").with_flags("PCOS, Menopause,");
        assert_eq!(item.flags.len(), 2);
        assert_eq!(item.flags_raw.as_deref(), Some("PCOS, Menopause,"));
    }

    #[test]
    fn test_search_haystacks_skip_absent() {
        let item = FoodItem::new("Salmon").with_text(TextField::Mechanism, "Omega-3 rich");
        let hay: Vec<&str> = item.search_haystacks().collect();
        assert_eq!(hay, vec!["Salmon", "Omega-3 rich"]);
    }
}
