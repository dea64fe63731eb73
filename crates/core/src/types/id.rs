//! Newtype IDs for type-safe entity references.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Error returned when a product ID is not a positive integer.
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("product id must be a positive integer")]
pub struct ZeroProductId;

/// Identifier of a product inside the content document.
///
/// IDs are positive integers, unique within a document's product list. They
/// are only used for lookups while editing and are never shown to visitors,
/// so reusing the ID of a deleted product is harmless.
///
/// ```
/// use artistic_gurl_core::ProductId;
///
/// let id = ProductId::new(7).unwrap();
/// assert_eq!(id.get(), 7);
/// assert!(ProductId::new(0).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct ProductId(u32);

impl ProductId {
    /// The first ID handed out for an empty catalog.
    pub const FIRST: Self = Self(1);

    /// Create a product ID.
    ///
    /// # Errors
    ///
    /// Returns [`ZeroProductId`] if `id` is zero.
    pub const fn new(id: u32) -> Result<Self, ZeroProductId> {
        if id == 0 {
            Err(ZeroProductId)
        } else {
            Ok(Self(id))
        }
    }

    /// Get the underlying integer value.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// The ID following this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for ProductId {
    type Error = ZeroProductId;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::new(id)
    }
}

impl From<ProductId> for u32 {
    fn from(id: ProductId) -> Self {
        id.0
    }
}

impl std::str::FromStr for ProductId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw: u32 = s
            .trim()
            .parse()
            .map_err(|e| format!("invalid product id {s:?}: {e}"))?;
        Self::new(raw).map_err(|e| e.to_string())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_is_rejected() {
        assert_eq!(ProductId::new(0), Err(ZeroProductId));
        assert!(serde_json::from_str::<ProductId>("0").is_err());
    }

    #[test]
    fn test_serializes_as_bare_integer() {
        let id = ProductId::new(42).unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), "42");
        assert_eq!(serde_json::from_str::<ProductId>("42").unwrap(), id);
    }

    #[test]
    fn test_negative_is_rejected() {
        assert!(serde_json::from_str::<ProductId>("-3").is_err());
    }

    #[test]
    fn test_from_str() {
        assert_eq!("12".parse::<ProductId>().unwrap().get(), 12);
        assert!("0".parse::<ProductId>().is_err());
        assert!("abc".parse::<ProductId>().is_err());
    }

    #[test]
    fn test_next() {
        assert_eq!(ProductId::FIRST.next().get(), 2);
    }
}
