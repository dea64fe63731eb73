//! Versioned files held in process memory.
//!
//! [`VersionedFiles`] mimics the conditional-write rules of the contents API
//! and is shared with the mock API server used by the integration tests.
//! [`InMemoryContentStore`] puts the [`ContentStore`] interface on top of it.

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use artistic_gurl_core::{ContentDocument, VersionToken};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument, warn};

use super::{
    AssetLayout, AssetReference, ContentStore, Snapshot, StoreError, decode_document,
    encode_document,
};

/// One stored file revision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub bytes: Vec<u8>,
    /// Hex SHA-256 of `bytes`.
    pub sha: String,
}

impl StoredFile {
    fn new(bytes: Vec<u8>) -> Self {
        let sha = content_sha(&bytes);
        Self { bytes, sha }
    }
}

/// Why a conditional write was refused.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PutError {
    /// An update named a revision that is not the current one.
    #[error("{path} does not match {expected}")]
    ShaMismatch { path: String, expected: String },
    /// An update named a file that does not exist.
    #[error("{0} does not exist")]
    Missing(String),
    /// A create named a file that already exists.
    #[error("{0} already exists")]
    AlreadyExists(String),
}

/// Hex SHA-256 used as the revision token of stored content.
#[must_use]
pub fn content_sha(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Files keyed by path, each with a content-hash revision.
#[derive(Debug, Default)]
pub struct VersionedFiles {
    files: Mutex<BTreeMap<String, StoredFile>>,
}

impl VersionedFiles {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<String, StoredFile>> {
        self.files.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current revision of `path`.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<StoredFile> {
        self.lock().get(path).cloned()
    }

    /// Write `bytes` unconditionally and return the new revision.
    pub fn insert(&self, path: &str, bytes: impl Into<Vec<u8>>) -> String {
        let file = StoredFile::new(bytes.into());
        let sha = file.sha.clone();
        self.lock().insert(path.to_string(), file);
        sha
    }

    /// Conditional write.
    ///
    /// With `expected`, the file must exist at exactly that revision. Without
    /// it, the file must not exist yet. The check and the write happen under
    /// one lock, so of two writers holding the same revision only one wins.
    ///
    /// # Errors
    ///
    /// Returns a [`PutError`] and leaves the file untouched if the
    /// precondition does not hold.
    pub fn put(
        &self,
        path: &str,
        bytes: impl Into<Vec<u8>>,
        expected: Option<&str>,
    ) -> Result<String, PutError> {
        let mut files = self.lock();
        match (files.get(path), expected) {
            (Some(current), Some(expected)) if current.sha != expected => {
                return Err(PutError::ShaMismatch {
                    path: path.to_string(),
                    expected: expected.to_string(),
                });
            }
            (None, Some(_)) => return Err(PutError::Missing(path.to_string())),
            (Some(_), None) => return Err(PutError::AlreadyExists(path.to_string())),
            _ => {}
        }

        let file = StoredFile::new(bytes.into());
        let sha = file.sha.clone();
        files.insert(path.to_string(), file);
        Ok(sha)
    }

    /// Every stored path, sorted.
    #[must_use]
    pub fn paths(&self) -> Vec<String> {
        self.lock().keys().cloned().collect()
    }
}

/// Content store backed by [`VersionedFiles`].
///
/// Optionally accepts a single token only, and can be told to fail the next
/// call with a given error.
#[derive(Clone)]
pub struct InMemoryContentStore {
    files: Arc<VersionedFiles>,
    document_path: String,
    assets: AssetLayout,
    accepted_token: Option<SecretString>,
    injected_failure: Arc<Mutex<Option<StoreError>>>,
}

impl std::fmt::Debug for InMemoryContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContentStore")
            .field("document_path", &self.document_path)
            .field("assets", &self.assets)
            .field(
                "accepted_token",
                &self.accepted_token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish_non_exhaustive()
    }
}

impl InMemoryContentStore {
    /// Store over `files`, with the document at `document_path`.
    #[must_use]
    pub fn new(files: Arc<VersionedFiles>, document_path: &str, assets: AssetLayout) -> Self {
        Self {
            files,
            document_path: document_path.to_string(),
            assets,
            accepted_token: None,
            injected_failure: Arc::new(Mutex::new(None)),
        }
    }

    /// Store seeded with `document` at `public/db.json`, assets under
    /// `public/uploads`.
    ///
    /// # Errors
    ///
    /// Fails if the document cannot be serialized.
    pub fn seeded(document: &ContentDocument) -> Result<Self, StoreError> {
        let files = Arc::new(VersionedFiles::new());
        files.insert("public/db.json", encode_document(document)?);
        Ok(Self::new(
            files,
            "public/db.json",
            AssetLayout {
                dir: "public/uploads".to_string(),
                public_root: "public".to_string(),
                style: crate::config::AssetReferenceStyle::SiteRelative,
            },
        ))
    }

    /// Only accept `token`; anything else is [`StoreError::Unauthorized`].
    #[must_use]
    pub fn with_accepted_token(mut self, token: SecretString) -> Self {
        self.accepted_token = Some(token);
        self
    }

    /// Make the next store call fail with `err` without touching any file.
    pub fn fail_next(&self, err: StoreError) {
        *self
            .injected_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(err);
    }

    /// The shared files.
    #[must_use]
    pub fn files(&self) -> &Arc<VersionedFiles> {
        &self.files
    }

    /// Current version token of the document, if it exists.
    #[must_use]
    pub fn current_token(&self) -> Option<VersionToken> {
        self.files
            .get(&self.document_path)
            .map(|file| VersionToken::new(file.sha))
    }

    fn precheck(&self, credential: &SecretString) -> Result<(), StoreError> {
        if let Some(err) = self
            .injected_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(err);
        }
        let token = credential.expose_secret();
        if token.trim().is_empty() {
            return Err(StoreError::Unauthorized("no credential supplied".to_string()));
        }
        if let Some(accepted) = &self.accepted_token
            && accepted.expose_secret() != token
        {
            return Err(StoreError::Unauthorized("credential rejected".to_string()));
        }
        Ok(())
    }
}

impl ContentStore for InMemoryContentStore {
    #[instrument(skip_all, fields(path = %self.document_path))]
    async fn fetch_document(&self, credential: &SecretString) -> Result<Snapshot, StoreError> {
        self.precheck(credential)?;
        let file = self
            .files
            .get(&self.document_path)
            .ok_or_else(|| StoreError::NotFound(self.document_path.clone()))?;
        let document = decode_document(&file.bytes)?;
        debug!(sha = %file.sha, "Document read from memory");
        Ok(Snapshot {
            document,
            token: VersionToken::new(file.sha),
        })
    }

    #[instrument(skip_all, fields(path = %self.document_path, expected = %expected.short()))]
    async fn save_document(
        &self,
        credential: &SecretString,
        document: &ContentDocument,
        expected: &VersionToken,
    ) -> Result<VersionToken, StoreError> {
        self.precheck(credential)?;
        let bytes = encode_document(document)?;
        match self
            .files
            .put(&self.document_path, bytes, Some(expected.as_str()))
        {
            Ok(sha) => {
                info!(sha = %sha, "Document saved to memory");
                Ok(VersionToken::new(sha))
            }
            Err(PutError::Missing(path)) => Err(StoreError::NotFound(path)),
            Err(err) => {
                warn!(error = %err, "Document save rejected");
                Err(StoreError::Conflict(err.to_string()))
            }
        }
    }

    #[instrument(skip_all, fields(name = %suggested_name, size = bytes.len()))]
    async fn upload_asset(
        &self,
        credential: &SecretString,
        bytes: &[u8],
        suggested_name: &str,
    ) -> Result<AssetReference, StoreError> {
        self.precheck(credential)?;
        let path = self
            .assets
            .asset_path(chrono::Utc::now().timestamp_millis(), suggested_name);
        self.files
            .put(&path, bytes, None)
            .map_err(|e| StoreError::Transport(e.to_string()))?;
        info!(path = %path, "Asset stored in memory");
        Ok(self
            .assets
            .reference(&path, Some(&format!("memory:///{path}"))))
    }
}
