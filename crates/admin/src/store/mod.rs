//! Content store client: fetch, conditional save and asset upload against a
//! remote versioned-file store.
//!
//! Stores are stateless. They never keep a copy of the document between
//! calls; the version token returned by a fetch or save is the caller's to
//! keep and hand back on the next save.
//!
//! # Implementations
//!
//! - [`GitHubContentStore`] - GitHub-compatible contents API over HTTPS
//! - [`InMemoryContentStore`] - versioned files in process memory

mod github;
mod memory;

pub use github::GitHubContentStore;
pub use memory::{InMemoryContentStore, PutError, StoredFile, VersionedFiles, content_sha};

use std::future::Future;

use artistic_gurl_core::{ContentDocument, ContentError, VersionToken};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use secrecy::SecretString;
use serde::Serialize;
use thiserror::Error;

use crate::config::{AssetReferenceStyle, ContentRepoConfig};

/// Errors returned by a content store.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    /// Credential missing or rejected. Not retriable without a new credential.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The remote object does not exist.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Payload is not valid base64, UTF-8 or JSON.
    #[error("Corrupt document: {0}")]
    CorruptDocument(String),

    /// Payload is JSON but does not have the document's shape.
    #[error("Schema error: {0}")]
    Schema(String),

    /// The remote document moved on since the token was issued.
    #[error("Version conflict: {0}")]
    Conflict(String),

    /// Network failure, timeout or unexpected response.
    #[error("Transport error: {0}")]
    Transport(String),
}

impl StoreError {
    /// Whether repeating the call may succeed without operator action.
    #[must_use]
    pub const fn is_retriable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

impl From<ContentError> for StoreError {
    fn from(err: ContentError) -> Self {
        if err.is_schema() {
            Self::Schema(err.to_string())
        } else {
            Self::CorruptDocument(err.to_string())
        }
    }
}

/// A document together with the version token it was read at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub document: ContentDocument,
    pub token: VersionToken,
}

/// Reference to an uploaded asset, as stored in a product's `image` field.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct AssetReference(String);

impl AssetReference {
    #[must_use]
    pub fn new(reference: impl Into<String>) -> Self {
        Self(reference.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.0
    }
}

impl std::fmt::Display for AssetReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Remote versioned-file store holding the content document and assets.
pub trait ContentStore: Send + Sync {
    /// Read the current document and its version token.
    fn fetch_document(
        &self,
        credential: &SecretString,
    ) -> impl Future<Output = Result<Snapshot, StoreError>> + Send;

    /// Replace the document, provided the remote is still at `expected`.
    ///
    /// On [`StoreError::Conflict`] the remote document is unchanged.
    fn save_document(
        &self,
        credential: &SecretString,
        document: &ContentDocument,
        expected: &VersionToken,
    ) -> impl Future<Output = Result<VersionToken, StoreError>> + Send;

    /// Create a new asset object and return how the document should refer to it.
    fn upload_asset(
        &self,
        credential: &SecretString,
        bytes: &[u8],
        suggested_name: &str,
    ) -> impl Future<Output = Result<AssetReference, StoreError>> + Send;
}

/// Where assets go and how they are referenced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetLayout {
    /// Directory assets are created in, without surrounding slashes.
    pub dir: String,
    /// Directory served as the site root, without surrounding slashes.
    pub public_root: String,
    pub style: AssetReferenceStyle,
}

impl AssetLayout {
    #[must_use]
    pub fn from_config(config: &ContentRepoConfig) -> Self {
        Self {
            dir: config.asset_dir.clone(),
            public_root: config.asset_public_root.clone(),
            style: config.reference_style,
        }
    }

    /// Repository path for a new asset: `<dir>/<millis>_<sanitized name>`.
    #[must_use]
    pub fn asset_path(&self, uploaded_at_millis: i64, suggested_name: &str) -> String {
        let file = format!("{uploaded_at_millis}_{}", sanitize_file_name(suggested_name));
        if self.dir.is_empty() {
            file
        } else {
            format!("{}/{file}", self.dir)
        }
    }

    /// Path of `repo_path` relative to the deployed site root.
    #[must_use]
    pub fn site_relative(&self, repo_path: &str) -> AssetReference {
        let relative = if self.public_root.is_empty() {
            repo_path
        } else {
            repo_path
                .strip_prefix(self.public_root.as_str())
                .and_then(|rest| rest.strip_prefix('/'))
                .unwrap_or(repo_path)
        };
        AssetReference::new(format!("/{relative}"))
    }

    /// Pick the reference for a created asset according to the style.
    #[must_use]
    pub fn reference(&self, repo_path: &str, download_url: Option<&str>) -> AssetReference {
        match (self.style, download_url) {
            (AssetReferenceStyle::DownloadUrl, Some(url)) => AssetReference::new(url),
            _ => self.site_relative(repo_path),
        }
    }
}

/// Reduce an uploaded file name to a safe single path segment.
///
/// Directory components are dropped; characters outside `[A-Za-z0-9._-]`
/// become `_`; leading dots are removed.
#[must_use]
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(['/', '\\']).next().unwrap_or(name).trim();
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        "upload".to_string()
    } else {
        cleaned.to_string()
    }
}

/// Decode a document from raw file bytes.
///
/// # Errors
///
/// [`StoreError::CorruptDocument`] for invalid UTF-8 or JSON,
/// [`StoreError::Schema`] for JSON of the wrong shape.
pub fn decode_document(bytes: &[u8]) -> Result<ContentDocument, StoreError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|e| StoreError::CorruptDocument(format!("document is not UTF-8: {e}")))?;
    Ok(ContentDocument::parse_str(text)?)
}

/// Decode a document from base64 as returned by the contents API.
///
/// Line breaks in the payload are ignored.
///
/// # Errors
///
/// As [`decode_document`], plus [`StoreError::CorruptDocument`] for invalid
/// base64.
pub fn decode_base64_document(content: &str) -> Result<ContentDocument, StoreError> {
    let bytes = decode_base64(content)
        .map_err(|e| StoreError::CorruptDocument(format!("document is not base64: {e}")))?;
    decode_document(&bytes)
}

/// Serialize a document to the bytes committed to the store.
///
/// # Errors
///
/// [`StoreError::Schema`] if the document cannot be serialized.
pub fn encode_document(document: &ContentDocument) -> Result<Vec<u8>, StoreError> {
    document
        .to_pretty_json()
        .map(String::into_bytes)
        .map_err(|e| StoreError::Schema(format!("document cannot be serialized: {e}")))
}

/// Decode base64 content, ignoring line breaks and other whitespace.
///
/// # Errors
///
/// Returns the decoder error for invalid base64.
pub fn decode_base64(content: &str) -> Result<Vec<u8>, base64::DecodeError> {
    let compact: String = content.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    STANDARD.decode(compact)
}

/// Encode bytes as standard padded base64.
#[must_use]
pub fn encode_base64(bytes: &[u8]) -> String {
    STANDARD.encode(bytes)
}
