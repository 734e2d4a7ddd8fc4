//! Home-feed filtering: category chips plus a title search.

use crate::models::{Item, ItemKind};

/// Chip labels shown on the home feed, in display order.
pub const CATEGORIES: &[&str] = &[
    "All",
    "Textbooks",
    "Electronics",
    "Furniture",
    "Clothing",
    "Sports",
    "Swaps",
    "Rentals",
];

/// A selected feed chip. "Swaps" and "Rentals" select by disposition, not by
/// item category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedCategory {
    All,
    Swaps,
    Rentals,
    Named(String),
}

impl FeedCategory {
    /// Interpret a chip label.
    pub fn parse(label: &str) -> Self {
        match label {
            "All" => FeedCategory::All,
            "Swaps" => FeedCategory::Swaps,
            "Rentals" => FeedCategory::Rentals,
            other => FeedCategory::Named(other.to_string()),
        }
    }

    fn matches(&self, item: &Item) -> bool {
        match self {
            FeedCategory::All => true,
            FeedCategory::Swaps => item.kind == ItemKind::Swap,
            FeedCategory::Rentals => item.kind == ItemKind::Rent,
            FeedCategory::Named(category) => item.category == *category,
        }
    }
}

/// Whether an item survives the current chip selection and search query.
/// Search is a case-insensitive title substring; an empty query matches all.
pub fn matches(item: &Item, category: &FeedCategory, search: &str) -> bool {
    let matches_search =
        search.is_empty() || item.title.to_lowercase().contains(&search.to_lowercase());
    matches_search && category.matches(item)
}
