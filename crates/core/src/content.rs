//! The content document: everything the shop site renders.
//!
//! The document is a single JSON file committed to the site's repository. Its
//! key names (`siteConfig.title`, `products[].category`, ...) are read by the
//! front end directly, so the serde names here are a stable contract.
//!
//! Keys this model does not know about are kept in `extra` maps and written
//! back untouched.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::types::{ColorToken, IconToken, ProductId, Rating};

/// Top-level keys every content document must carry.
pub const REQUIRED_SECTIONS: [&str; 5] =
    ["siteConfig", "products", "categories", "contact", "reviews"];

/// Errors that can occur when reading a content document.
#[derive(thiserror::Error, Debug)]
pub enum ContentError {
    /// The payload is not valid JSON.
    #[error("content is not valid JSON: {0}")]
    Syntax(#[source] serde_json::Error),

    /// The payload is JSON but not an object.
    #[error("content must be a JSON object")]
    NotAnObject,

    /// A required top-level section is missing.
    #[error("content is missing required section `{0}`")]
    MissingSection(&'static str),

    /// A section is present but has the wrong shape.
    #[error("content section is malformed: {0}")]
    InvalidSection(#[source] serde_json::Error),
}

impl ContentError {
    /// Whether the payload parsed as JSON but failed the document schema.
    #[must_use]
    pub const fn is_schema(&self) -> bool {
        !matches!(self, Self::Syntax(_))
    }
}

/// Site-wide texts shown in the header, hero banner and ticker.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SiteConfig {
    pub title: String,
    pub announcement: String,
    pub hero_title: String,
    pub hero_subtitle: String,
    /// Short phrases scrolled under the hero banner.
    pub ticker: Vec<String>,
    pub phone: String,
    pub email: String,
    pub instagram: String,
}

/// Contact channels shown in the footer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Contact {
    pub email: String,
    pub phone: String,
    pub instagram: String,
}

/// A card in the product gallery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(default)]
    pub title: String,
    /// Free-text price including currency, e.g. `PKR 1500`.
    #[serde(default)]
    pub price: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "desc", default)]
    pub description: String,
    #[serde(rename = "color", default)]
    pub color: ColorToken,
    #[serde(rename = "icon", default)]
    pub icon: IconToken,
    /// Rendered instead of the icon when present.
    #[serde(rename = "image", default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Product {
    /// A freshly added product with placeholder values.
    #[must_use]
    pub fn placeholder(id: ProductId) -> Self {
        Self {
            id,
            title: "New Product".to_string(),
            price: "PKR 0".to_string(),
            category: "General".to_string(),
            description: "Description here".to_string(),
            color: ColorToken::default(),
            icon: IconToken::Gift,
            image: None,
            extra: Map::new(),
        }
    }
}

/// A customer review.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub rating: Rating,
    #[serde(default)]
    pub text: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// The whole editable site content.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentDocument {
    pub site_config: SiteConfig,
    pub categories: Vec<String>,
    pub products: Vec<Product>,
    pub contact: Contact,
    pub reviews: Vec<Review>,
    /// Top-level keys not modelled above.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentDocument {
    /// Parse a document from an already-decoded JSON value.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::MissingSection`] naming the first absent
    /// required key, [`ContentError::NotAnObject`] for non-object input, or
    /// [`ContentError::InvalidSection`] if a section has the wrong shape.
    pub fn parse(raw: Value) -> Result<Self, ContentError> {
        let Some(object) = raw.as_object() else {
            return Err(ContentError::NotAnObject);
        };

        if let Some(missing) = REQUIRED_SECTIONS
            .iter()
            .find(|key| !object.contains_key(**key))
        {
            return Err(ContentError::MissingSection(*missing));
        }

        serde_json::from_value(raw).map_err(ContentError::InvalidSection)
    }

    /// Parse a document from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`ContentError::Syntax`] if the text is not JSON, otherwise
    /// the errors of [`ContentDocument::parse`].
    pub fn parse_str(raw: &str) -> Result<Self, ContentError> {
        let value: Value = serde_json::from_str(raw).map_err(ContentError::Syntax)?;
        Self::parse(value)
    }

    /// Parse a document from JSON bytes.
    ///
    /// # Errors
    ///
    /// Same as [`ContentDocument::parse_str`].
    pub fn parse_slice(raw: &[u8]) -> Result<Self, ContentError> {
        let value: Value = serde_json::from_slice(raw).map_err(ContentError::Syntax)?;
        Self::parse(value)
    }

    /// Serialize as pretty-printed JSON (two-space indent).
    ///
    /// # Errors
    ///
    /// Fails only if an `extra` value cannot be serialized, which cannot
    /// happen for values that came out of a parse.
    pub fn to_pretty_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// ID for the next product: one past the highest existing ID.
    #[must_use]
    pub fn next_product_id(&self) -> ProductId {
        self.products
            .iter()
            .map(|p| p.id)
            .max()
            .map_or(ProductId::FIRST, ProductId::next)
    }

    /// Look up a product by ID.
    #[must_use]
    pub fn product(&self, id: ProductId) -> Option<&Product> {
        self.products.iter().find(|p| p.id == id)
    }

    /// Look up a product by ID for editing.
    pub fn product_mut(&mut self, id: ProductId) -> Option<&mut Product> {
        self.products.iter_mut().find(|p| p.id == id)
    }

    /// Whether `category` is one of the declared categories.
    #[must_use]
    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }
}
