//! Nourish - Result ordering
//!
//! Sorting is stable and total: unscored items trail in both score
//! directions, and equal scores fall back to name order so repeated queries
//! render identically.

use std::cmp::Ordering;

use crate::filter::SortKey;
use crate::model::FoodItem;

/// Order `items` in place by `key`.
pub fn sort_items(items: &mut [&FoodItem], key: SortKey) {
    items.sort_by(|a, b| compare(a, b, key));
}

/// Comparator behind [`sort_items`].
pub fn compare(a: &FoodItem, b: &FoodItem, key: SortKey) -> Ordering {
    match key {
        SortKey::ScoreDesc => by_score(a, b, true).then_with(|| by_name(a, b)),
        SortKey::ScoreAsc => by_score(a, b, false).then_with(|| by_name(a, b)),
        SortKey::NameAsc => by_name(a, b),
    }
}

fn by_score(a: &FoodItem, b: &FoodItem, descending: bool) -> Ordering {
    match (a.score, b.score) {
        (Some(x), Some(y)) => {
            let ord = x.value().total_cmp(&y.value());
            if descending {
                ord.reverse()
            } else {
                ord
            }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn by_name(a: &FoodItem, b: &FoodItem) -> Ordering {
    a.name
        .to_lowercase()
        .cmp(&b.name.to_lowercase())
        .then_with(|| a.name.cmp(&b.name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sorted(items: &[FoodItem], key: SortKey) -> Vec<String> {
        let mut refs: Vec<&FoodItem> = items.iter().collect();
        sort_items(&mut refs, key);
        refs.iter().map(|i| i.name.clone()).collect()
    }

    fn items() -> Vec<FoodItem> {
        vec![
            FoodItem::new("banana").with_score(6.0),
            FoodItem::new("Apple").with_score(8.0),
            FoodItem::new("Unscored"),
            FoodItem::new("cherry").with_score(9.0),
            FoodItem::new("Date").with_score(8.0),
        ]
    }

    #[test]
    fn test_score_desc() {
        assert_eq!(
            sorted(&items(), SortKey::ScoreDesc),
            vec!["cherry", "Apple", "Date", "banana", "Unscored"]
        );
    }

    #[test]
    fn test_score_asc_keeps_unscored_last() {
        assert_eq!(
            sorted(&items(), SortKey::ScoreAsc),
            vec!["banana", "Apple", "Date", "cherry", "Unscored"]
        );
    }

    #[test]
    fn test_name_is_case_insensitive() {
        assert_eq!(
            sorted(&items(), SortKey::NameAsc),
            vec!["Apple", "banana", "cherry", "Date", "Unscored"]
        );
    }

    #[test]
    fn test_name_tie_break_is_deterministic() {
        let items = vec![FoodItem::new("kale"), FoodItem::new("Kale")];
        assert_eq!(sorted(&items, SortKey::NameAsc), vec!["Kale", "kale"]);
    }

    #[test]
    fn test_sort_is_a_permutation() {
        let items = items();
        for key in SortKey::ALL {
            let mut names = sorted(&items, key);
            names.sort();
            let mut expected: Vec<String> = items.iter().map(|i| i.name.clone()).collect();
            expected.sort();
            assert_eq!(names, expected);
        }
    }
}
