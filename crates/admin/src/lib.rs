//! Artistic Gurl Admin library.
//!
//! Content synchronization for the shop site: the content document lives in
//! a source-control repository and is edited through the contents API with
//! optimistic concurrency (every write carries the version token of the
//! last read).
//!
//! # Modules
//!
//! - [`store`] - Content store trait, GitHub and in-memory implementations
//! - [`session`] - Edit session state machine over one draft
//! - [`upload`] - Asset upload and attach pipeline
//! - [`credentials`] - Operator token storage
//! - [`routes`] - Local JSON admin API
//!
//! # Security
//!
//! The admin API has no authentication of its own and holds a token with
//! write access to the site repository. Bind it to localhost only.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod credentials;
pub mod error;
pub mod routes;
pub mod session;
pub mod state;
pub mod store;
pub mod upload;

pub use config::{AdminConfig, AssetReferenceStyle, ConfigError, ContentRepoConfig};
pub use credentials::{
    CredentialError, CredentialStore, FileCredentialStore, InMemoryCredentialStore,
};
pub use error::AppError;
pub use session::{EditSession, ProductPatch, SaveRequest, SessionError, SessionState, SiteField};
pub use state::AppState;
pub use store::{
    AssetLayout, AssetReference, ContentStore, GitHubContentStore, InMemoryContentStore,
    Snapshot, StoreError,
};
pub use upload::{UploadOutcome, upload_and_attach};
