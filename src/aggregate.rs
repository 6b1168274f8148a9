//! Nourish - Plan aggregates
//!
//! Derived views of the current plan: the nutrients it covers, the cautions
//! to keep in mind and the recipe list. Aggregates are recomputed from the
//! catalog and the plan on every call and hold no state of their own.

use serde::Serialize;
use std::collections::BTreeSet;
use tracing::debug;

use crate::data::Catalog;
use crate::model::{FoodItem, Score, TextField};
use crate::plan::PlanSelection;
use crate::tokens::TokenSet;

/// Default "nothing to warn about" cautions value of the dataset.
pub const DEFAULT_NO_CAUTION: &str = "None specific.";

/// One recipe line, in plan order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecipeLine {
    pub name: String,
    /// Recipe/usage text, or the placeholder
    pub recipe: String,
}

/// Summary row of a plan member
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlanRow {
    pub name: String,
    pub category: String,
    pub score: Option<Score>,
    pub best_for: String,
}

impl PlanRow {
    fn from_item(item: &FoodItem) -> Self {
        Self {
            name: item.name.clone(),
            category: item.category_or_placeholder().to_string(),
            score: item.score,
            best_for: item.text(TextField::BestFor).to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct PlanAggregates {
    /// Plan members in plan order
    pub items: Vec<PlanRow>,
    /// Union of nutrient tokens
    pub nutrients: TokenSet,
    /// Distinct caution texts, sentinel excluded
    pub cautions: BTreeSet<String>,
    pub recipes: Vec<RecipeLine>,
    /// Union of health flag tokens
    pub flags: TokenSet,
    /// Mean over scored members
    pub average_score: Option<f64>,
    /// Plan entries with no catalog row
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
}

impl PlanAggregates {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Computes [`PlanAggregates`] with a configured caution sentinel
#[derive(Debug, Clone)]
pub struct PlanAggregator {
    no_caution_sentinel: String,
}

impl Default for PlanAggregator {
    fn default() -> Self {
        Self::new(DEFAULT_NO_CAUTION)
    }
}

impl PlanAggregator {
    pub fn new(no_caution_sentinel: impl Into<String>) -> Self {
        Self {
            no_caution_sentinel: no_caution_sentinel.into().trim().to_string(),
        }
    }

    pub fn compute(&self, catalog: &Catalog, plan: &PlanSelection) -> PlanAggregates {
        let mut aggregates = PlanAggregates::default();
        let mut score_total = 0.0;
        let mut scored = 0usize;

        for name in plan.iter() {
            let Some(item) = catalog.get(name) else {
                debug!("Plan entry '{}' has no catalog row", name);
                aggregates.missing.push(name.to_string());
                continue;
            };

            aggregates.items.push(PlanRow::from_item(item));
            aggregates.nutrients.extend_from(&item.nutrients);
            aggregates.flags.extend_from(&item.flags);

            if let Some(caution) = self.caution(item) {
                aggregates.cautions.insert(caution.to_string());
            }

            aggregates.recipes.push(RecipeLine {
                name: item.name.clone(),
                recipe: item.text(TextField::Recipe).to_string(),
            });

            if let Some(score) = item.score {
                score_total += score.value();
                scored += 1;
            }
        }

        if scored > 0 {
            aggregates.average_score = Some(score_total / scored as f64);
        }
        aggregates
    }

    /// The item's caution text, unless empty or the sentinel
    fn caution<'a>(&self, item: &'a FoodItem) -> Option<&'a str> {
        item.cautions
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty() && *c != self.no_caution_sentinel)
    }
}

/// Aggregates with the default caution sentinel.
pub fn compute_aggregates(catalog: &Catalog, plan: &PlanSelection) -> PlanAggregates {
    PlanAggregator::default().compute(catalog, plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NOT_AVAILABLE;
    use crate::plan::remove_from_plan;

    fn catalog() -> Catalog {
        Catalog::from_items(vec![
            FoodItem::new("A")
                .with_score(8.0)
                .with_nutrients("Vitamin C, Fiber")
                .with_flags("PCOS")
                .with_text(TextField::Cautions, "None specific.")
                .with_text(TextField::Recipe, "Smoothie"),
            FoodItem::new("B")
                .with_score(6.0)
                .with_nutrients("Omega-3, Vitamin D")
                .with_flags("Menopause")
                .with_text(TextField::Cautions, " Mercury in large fish "),
            FoodItem::new("C")
                .with_nutrients("Iron")
                .with_text(TextField::Cautions, "Oxalates"),
        ])
    }

    #[test]
    fn test_nutrients_are_union_of_members_only() {
        let catalog = catalog();
        let plan: PlanSelection = ["A", "B"].into_iter().collect();
        let aggregates = compute_aggregates(&catalog, &plan);

        assert_eq!(
            aggregates.nutrients.to_vec(),
            vec!["Fiber", "Omega-3", "Vitamin C", "Vitamin D"]
        );
        assert!(!aggregates.nutrients.contains("Iron"));
    }

    #[test]
    fn test_cautions_exclude_sentinel_and_trim() {
        let catalog = catalog();
        let plan: PlanSelection = ["A", "B"].into_iter().collect();
        let aggregates = compute_aggregates(&catalog, &plan);

        assert_eq!(
            aggregates.cautions.into_iter().collect::<Vec<_>>(),
            vec!["Mercury in large fish".to_string()]
        );
    }

    #[test]
    fn test_custom_sentinel() {
        let catalog = catalog();
        let plan: PlanSelection = ["A", "C"].into_iter().collect();
        let aggregates = PlanAggregator::new("Oxalates").compute(&catalog, &plan);
        assert_eq!(
            aggregates.cautions.into_iter().collect::<Vec<_>>(),
            vec!["None specific.".to_string()]
        );
    }

    #[test]
    fn test_recipes_follow_plan_order_with_placeholder() {
        let catalog = catalog();
        let plan: PlanSelection = ["B", "A"].into_iter().collect();
        let aggregates = compute_aggregates(&catalog, &plan);

        assert_eq!(
            aggregates.recipes,
            vec![
                RecipeLine {
                    name: "B".into(),
                    recipe: NOT_AVAILABLE.into()
                },
                RecipeLine {
                    name: "A".into(),
                    recipe: "Smoothie".into()
                },
            ]
        );
    }

    #[test]
    fn test_remove_recomputes() {
        let catalog = catalog();
        let plan: PlanSelection = ["A", "B"].into_iter().collect();
        let (plan, _) = remove_from_plan(plan, "A");
        let aggregates = compute_aggregates(&catalog, &plan);

        assert_eq!(aggregates.nutrients.to_vec(), vec!["Omega-3", "Vitamin D"]);
        assert_eq!(aggregates.cautions.len(), 1);
        assert_eq!(aggregates.flags.to_vec(), vec!["Menopause"]);
        assert_eq!(aggregates.recipes.len(), 1);
    }

    #[test]
    fn test_average_skips_unscored() {
        let catalog = catalog();
        let plan: PlanSelection = ["A", "B", "C"].into_iter().collect();
        let aggregates = compute_aggregates(&catalog, &plan);
        assert_eq!(aggregates.average_score, Some(7.0));
        assert_eq!(aggregates.items.len(), 3);
    }

    #[test]
    fn test_empty_plan() {
        let aggregates = compute_aggregates(&catalog(), &PlanSelection::new());
        assert!(aggregates.is_empty());
        assert!(aggregates.nutrients.is_empty());
        assert_eq!(aggregates.average_score, None);
    }

    #[test]
    fn test_unknown_plan_entry_is_reported() {
        let plan: PlanSelection = ["A", "Ghost"].into_iter().collect();
        let aggregates = compute_aggregates(&catalog(), &plan);
        assert_eq!(aggregates.missing, vec!["Ghost".to_string()]);
        assert_eq!(aggregates.items.len(), 1);
    }
}
