//! Gallery filtering: the category tabs and search box on the public page.

use serde::{Deserialize, Serialize};

use crate::content::{ContentDocument, Product};

/// Label of the tab that shows every product.
pub const ALL_CATEGORIES: &str = "All";

/// Which category tab is selected.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CategoryFilter {
    #[default]
    All,
    Named(String),
}

impl CategoryFilter {
    fn matches(&self, product: &Product) -> bool {
        match self {
            Self::All => true,
            Self::Named(name) => product.category == *name,
        }
    }
}

impl From<String> for CategoryFilter {
    fn from(label: String) -> Self {
        if label.is_empty() || label == ALL_CATEGORIES {
            Self::All
        } else {
            Self::Named(label)
        }
    }
}

impl From<&str> for CategoryFilter {
    fn from(label: &str) -> Self {
        Self::from(label.to_string())
    }
}

impl From<CategoryFilter> for String {
    fn from(filter: CategoryFilter) -> Self {
        match filter {
            CategoryFilter::All => ALL_CATEGORIES.to_string(),
            CategoryFilter::Named(name) => name,
        }
    }
}

/// Gallery filter: a category tab plus an optional search phrase.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GalleryFilter {
    #[serde(default)]
    pub category: CategoryFilter,
    /// Case-insensitive substring matched against title and description.
    #[serde(default)]
    pub search: Option<String>,
}

impl GalleryFilter {
    /// Filter on a category only.
    #[must_use]
    pub fn category(category: impl Into<CategoryFilter>) -> Self {
        Self {
            category: category.into(),
            search: None,
        }
    }

    /// Add a search phrase.
    #[must_use]
    pub fn with_search(mut self, search: impl Into<String>) -> Self {
        self.search = Some(search.into());
        self
    }

    /// Whether `product` passes this filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if !self.category.matches(product) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(needle) => {
                let needle = needle.to_lowercase();
                product.title.to_lowercase().contains(&needle)
                    || product.description.to_lowercase().contains(&needle)
            }
        }
    }
}

impl ContentDocument {
    /// Tab labels: "All" followed by each product category in first-seen order.
    #[must_use]
    pub fn gallery_categories(&self) -> Vec<&str> {
        let mut labels = vec![ALL_CATEGORIES];
        for product in &self.products {
            let category = product.category.as_str();
            if !labels.contains(&category) {
                labels.push(category);
            }
        }
        labels
    }

    /// Products passing `filter`, in catalog order.
    #[must_use]
    pub fn filter_products(&self, filter: &GalleryFilter) -> Vec<&Product> {
        self.products.iter().filter(|p| filter.matches(p)).collect()
    }
}
