//! Core value types for the content model.
//!
//! This module provides type-safe wrappers for the small domain concepts the
//! content document is built from.

pub mod id;
pub mod rating;
pub mod token;
pub mod version;

pub use id::{ProductId, ZeroProductId};
pub use rating::{Rating, RatingError};
pub use token::{ColorToken, IconToken};
pub use version::VersionToken;
