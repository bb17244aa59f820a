//! Category index derived from the quote collection.

use quote_sync_types::{ALL_CATEGORIES, Quote};
use std::collections::HashSet;

/// Distinct categories in first-seen order, always led by `"all"`.
#[derive(Debug, Clone)]
pub struct CategoryIndex {
    categories: Vec<String>,
}

impl CategoryIndex {
    pub fn build(quotes: &[Quote]) -> Self {
        Self {
            categories: categories(quotes),
        }
    }

    pub fn refresh(&mut self, quotes: &[Quote]) {
        self.categories = categories(quotes);
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    /// Number of real categories, excluding the sentinel.
    pub fn len(&self) -> usize {
        self.categories.len() - 1
    }

    pub fn contains(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}

pub fn categories(quotes: &[Quote]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut out = vec![ALL_CATEGORIES.to_string()];
    for q in quotes {
        if seen.insert(q.category.as_str()) {
            out.push(q.category.clone());
        }
    }
    out
}

/// Quotes matching `selected`, in collection order.
pub fn filter(quotes: &[Quote], selected: &str) -> Vec<Quote> {
    if selected == ALL_CATEGORIES {
        return quotes.to_vec();
    }
    quotes
        .iter()
        .filter(|q| q.category == selected)
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Quote> {
        vec![
            Quote::new("a", None, "Life"),
            Quote::new("b", None, "Motivation"),
            Quote::new("c", Some("Ann"), "Life"),
            Quote::new("d", None, "Success"),
        ]
    }

    #[test]
    fn test_categories_first_seen_order() {
        assert_eq!(
            categories(&sample()),
            vec!["all", "Life", "Motivation", "Success"]
        );
    }

    #[test]
    fn test_categories_empty_collection() {
        let index = CategoryIndex::build(&[]);
        assert_eq!(index.categories(), ["all"]);
        assert_eq!(index.len(), 0);
    }

    #[test]
    fn test_filter_all_is_identity() {
        let quotes = sample();
        assert_eq!(filter(&quotes, ALL_CATEGORIES), quotes);
    }

    #[test]
    fn test_filter_keeps_relative_order() {
        let filtered = filter(&sample(), "Life");
        let texts: Vec<&str> = filtered.iter().map(|q| q.text.as_str()).collect();
        assert_eq!(texts, vec!["a", "c"]);
        assert!(filtered.iter().all(|q| q.category == "Life"));
    }

    #[test]
    fn test_filter_unknown_category_is_empty() {
        assert!(filter(&sample(), "Nope").is_empty());
    }

    #[test]
    fn test_refresh_picks_up_new_category() {
        let mut quotes = sample();
        let mut index = CategoryIndex::build(&quotes);
        assert!(!index.contains("Imported"));

        quotes.push(Quote::new("e", None, "Imported"));
        index.refresh(&quotes);
        assert!(index.contains("Imported"));
        assert_eq!(index.len(), 4);
    }
}
