//! Artistic Gurl Core - content model for the shop site.
//!
//! This crate provides the types shared by the admin tooling:
//! - `admin` - content store client, edit session and the local admin API
//! - `cli` - scripted content edits from the command line
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients. Parsing, validation, id allocation and gallery filtering all live
//! here so they can be tested without a remote store.
//!
//! # Modules
//!
//! - [`types`] - Newtypes for product IDs, ratings, version tokens and
//!   presentation tokens
//! - [`content`] - The content document and its JSON contract
//! - [`validation`] - Product and document validation findings
//! - [`gallery`] - Category tabs and search filtering
//! - [`custom_order`] - Custom order form message composition

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod content;
pub mod custom_order;
pub mod gallery;
pub mod types;
pub mod validation;

pub use content::{
    Contact, ContentDocument, ContentError, Product, REQUIRED_SECTIONS, Review, SiteConfig,
};
pub use custom_order::CustomOrderRequest;
pub use gallery::{ALL_CATEGORIES, CategoryFilter, GalleryFilter};
pub use types::*;
pub use validation::{Severity, Violation, validate_product};
