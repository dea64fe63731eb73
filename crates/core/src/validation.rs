//! Validation of products and whole documents.
//!
//! Validation never blocks a save by itself; callers decide what to do with
//! the findings. Unknown categories are only warnings: the shop has always
//! accepted products whose category is not in the declared list.

use core::fmt;
use std::collections::HashSet;

use serde::Serialize;

use crate::content::{ContentDocument, Product};
use crate::types::ProductId;

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
}

/// A single validation finding.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Violation {
    /// Product title is empty.
    EmptyTitle { product: ProductId },
    /// Product price is empty.
    EmptyPrice { product: ProductId },
    /// Product category is empty.
    EmptyCategory { product: ProductId },
    /// Product category is not one of the document's categories.
    UnknownCategory { product: ProductId, category: String },
    /// Two or more products share an ID.
    DuplicateId { product: ProductId },
}

impl Violation {
    /// Severity of this finding.
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::UnknownCategory { .. } => Severity::Warning,
            Self::EmptyTitle { .. }
            | Self::EmptyPrice { .. }
            | Self::EmptyCategory { .. }
            | Self::DuplicateId { .. } => Severity::Error,
        }
    }

    /// Whether this finding is only a warning.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self.severity(), Severity::Warning)
    }

    /// The product the finding is about.
    #[must_use]
    pub const fn product(&self) -> ProductId {
        match self {
            Self::EmptyTitle { product }
            | Self::EmptyPrice { product }
            | Self::EmptyCategory { product }
            | Self::UnknownCategory { product, .. }
            | Self::DuplicateId { product } => *product,
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyTitle { product } => write!(f, "product {product}: title is empty"),
            Self::EmptyPrice { product } => write!(f, "product {product}: price is empty"),
            Self::EmptyCategory { product } => write!(f, "product {product}: category is empty"),
            Self::UnknownCategory { product, category } => write!(
                f,
                "product {product}: category {category:?} is not in the category list"
            ),
            Self::DuplicateId { product } => write!(f, "product id {product} is used more than once"),
        }
    }
}

/// Check one product against the declared categories.
#[must_use]
pub fn validate_product(product: &Product, categories: &[String]) -> Vec<Violation> {
    let id = product.id;
    let mut violations = Vec::new();

    if product.title.trim().is_empty() {
        violations.push(Violation::EmptyTitle { product: id });
    }
    if product.price.trim().is_empty() {
        violations.push(Violation::EmptyPrice { product: id });
    }
    if product.category.trim().is_empty() {
        violations.push(Violation::EmptyCategory { product: id });
    } else if !categories.iter().any(|c| c == &product.category) {
        violations.push(Violation::UnknownCategory {
            product: id,
            category: product.category.clone(),
        });
    }

    violations
}

impl ContentDocument {
    /// Check one product against this document's categories.
    #[must_use]
    pub fn validate_product(&self, product: &Product) -> Vec<Violation> {
        validate_product(product, &self.categories)
    }

    /// Check every product, plus ID uniqueness across the catalog.
    #[must_use]
    pub fn validate(&self) -> Vec<Violation> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut violations = Vec::new();

        for product in &self.products {
            if !seen.insert(product.id) && reported.insert(product.id) {
                violations.push(Violation::DuplicateId {
                    product: product.id,
                });
            }
            violations.extend(self.validate_product(product));
        }

        violations
    }
}
