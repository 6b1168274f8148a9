//! Nourish - Meal plan selection
//!
//! The plan is plain state: an insertion-ordered list of unique food
//! identifiers. Every change goes through [`PlanSelection::reduce`] (or its
//! in-place twin [`PlanSelection::apply`]), which returns a [`PlanNotice`]
//! instead of failing, so no combination of actions can error.

use serde::Serialize;
use std::fmt;

/// A user action on the plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanAction {
    Add(String),
    Remove(String),
    /// "Start Over"
    Clear,
}

/// Outcome of a [`PlanAction`], shown to the user as a notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlanNotice {
    Added(String),
    /// The item was already selected; the plan is unchanged
    AlreadyPresent(String),
    Removed(String),
    /// The item was not in the plan; the plan is unchanged
    NotFound(String),
    /// Number of entries dropped
    Cleared(usize),
    /// The identifier does not exist in the catalog
    UnknownItem(String),
}

impl PlanNotice {
    pub fn message(&self) -> String {
        match self {
            PlanNotice::Added(name) => format!("Added {} to your plan!", name),
            PlanNotice::AlreadyPresent(name) => format!("{} is already in your plan.", name),
            PlanNotice::Removed(name) => format!("Removed {} from your plan.", name),
            PlanNotice::NotFound(name) => format!("{} is not in your plan.", name),
            PlanNotice::Cleared(0) => "Your plan is already empty.".to_string(),
            PlanNotice::Cleared(n) => format!("Cleared {} item(s) from your plan.", n),
            PlanNotice::UnknownItem(name) => format!("No food named '{}' in the catalog.", name),
        }
    }

    /// Whether the plan changed
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            PlanNotice::Added(_) | PlanNotice::Removed(_) | PlanNotice::Cleared(1..)
        )
    }
}

impl fmt::Display for PlanNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Selected food identifiers in the order they were added
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct PlanSelection {
    items: Vec<String>,
}

impl PlanSelection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, name: &str) -> PlanNotice {
        if self.contains(name) {
            return PlanNotice::AlreadyPresent(name.to_string());
        }
        self.items.push(name.to_string());
        PlanNotice::Added(name.to_string())
    }

    pub fn remove(&mut self, name: &str) -> PlanNotice {
        match self.items.iter().position(|n| n == name) {
            Some(index) => {
                self.items.remove(index);
                PlanNotice::Removed(name.to_string())
            }
            None => PlanNotice::NotFound(name.to_string()),
        }
    }

    pub fn clear(&mut self) -> PlanNotice {
        let dropped = self.items.len();
        self.items.clear();
        PlanNotice::Cleared(dropped)
    }

    pub fn apply(&mut self, action: PlanAction) -> PlanNotice {
        match action {
            PlanAction::Add(name) => self.add(&name),
            PlanAction::Remove(name) => self.remove(&name),
            PlanAction::Clear => self.clear(),
        }
    }

    /// State + action -> new state.
    pub fn reduce(mut self, action: PlanAction) -> (Self, PlanNotice) {
        let notice = self.apply(action);
        (self, notice)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.items.iter().any(|n| n == name)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.items.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.items
    }
}

impl<S: AsRef<str>> FromIterator<S> for PlanSelection {
    /// Later duplicates are dropped.
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut plan = PlanSelection::new();
        for name in iter {
            plan.add(name.as_ref());
        }
        plan
    }
}

/// Append `name` unless already present.
pub fn add_to_plan(plan: PlanSelection, name: &str) -> (PlanSelection, PlanNotice) {
    plan.reduce(PlanAction::Add(name.to_string()))
}

/// Remove `name` if present.
pub fn remove_from_plan(plan: PlanSelection, name: &str) -> (PlanSelection, PlanNotice) {
    plan.reduce(PlanAction::Remove(name.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_preserves_insertion_order() {
        let (plan, _) = add_to_plan(PlanSelection::new(), "B");
        let (plan, _) = add_to_plan(plan, "A");
        let (plan, _) = add_to_plan(plan, "C");
        assert_eq!(plan.as_slice(), ["B", "A", "C"]);
    }

    #[test]
    fn test_second_add_is_noop() {
        let (plan, first) = add_to_plan(PlanSelection::new(), "A");
        let (plan, _) = add_to_plan(plan, "B");
        let before = plan.clone();

        let (plan, second) = add_to_plan(plan, "A");
        assert_eq!(first, PlanNotice::Added("A".into()));
        assert_eq!(second, PlanNotice::AlreadyPresent("A".into()));
        assert!(!second.is_change());
        assert_eq!(plan, before);
    }

    #[test]
    fn test_remove() {
        let plan: PlanSelection = ["A", "B"].into_iter().collect();
        let (plan, notice) = remove_from_plan(plan, "A");
        assert_eq!(notice, PlanNotice::Removed("A".into()));
        assert_eq!(plan.as_slice(), ["B"]);

        let (plan, notice) = remove_from_plan(plan, "Z");
        assert_eq!(notice, PlanNotice::NotFound("Z".into()));
        assert_eq!(plan.len(), 1);
    }

    #[test]
    fn test_clear() {
        let mut plan: PlanSelection = ["A", "B", "A"].into_iter().collect();
        assert_eq!(plan.len(), 2);
        let notice = plan.apply(PlanAction::Clear);
        assert_eq!(notice, PlanNotice::Cleared(2));
        assert!(notice.is_change());
        assert!(plan.is_empty());
        assert!(!plan.clear().is_change());
    }

    #[test]
    fn test_notice_messages() {
        assert_eq!(
            PlanNotice::Added("Kale".into()).message(),
            "Added Kale to your plan!"
        );
        assert_eq!(
            PlanNotice::AlreadyPresent("Kale".into()).to_string(),
            "Kale is already in your plan."
        );
    }
}
