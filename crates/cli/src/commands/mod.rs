//! Subcommand implementations.
//!
//! Commands are generic over the content store so they can run against
//! [`InMemoryContentStore`](artistic_gurl_admin::InMemoryContentStore) in
//! tests.

pub mod content;
pub mod edit;
pub mod login;
pub mod upload;

use std::path::PathBuf;

use artistic_gurl_admin::{
    ConfigError, ContentRepoConfig, ContentStore, CredentialError, CredentialStore, EditSession,
    FileCredentialStore, GitHubContentStore, SessionError, StoreError,
};
use artistic_gurl_core::{ProductId, VersionToken};
use secrecy::SecretString;
use thiserror::Error;

/// Token file used when neither `--credential-file` nor
/// `ADMIN_CREDENTIAL_FILE` is given.
pub const DEFAULT_CREDENTIAL_FILE: &str = ".artistic-gurl-token";

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Environment configuration is missing or invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The content store rejected or failed a call.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The edit session refused an operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Token file could not be read or written.
    #[error(transparent)]
    Credential(#[from] CredentialError),

    /// No token in the token file or `GITHUB_TOKEN`.
    #[error("No token configured; run `ag-cli login --token <TOKEN>` or set GITHUB_TOKEN")]
    NoCredential,

    /// Login was given an empty token.
    #[error("Token must not be empty")]
    EmptyToken,

    /// The product does not exist in the document.
    #[error("Product {0} not found")]
    ProductNotFound(ProductId),

    /// A local file could not be read.
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Output could not be serialized.
    #[error("Failed to serialize output: {0}")]
    Json(#[from] serde_json::Error),

    /// Validation found errors.
    #[error("Document has {0} validation error(s)")]
    Invalid(usize),
}

/// Pick the token file: explicit flag, then `ADMIN_CREDENTIAL_FILE`, then
/// [`DEFAULT_CREDENTIAL_FILE`].
pub fn credential_store(explicit: Option<PathBuf>) -> FileCredentialStore {
    let path = explicit
        .or_else(|| {
            std::env::var("ADMIN_CREDENTIAL_FILE")
                .ok()
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CREDENTIAL_FILE));
    FileCredentialStore::new(path)
}

/// Everything a content command needs.
pub struct Context<S = GitHubContentStore> {
    store: S,
    credentials: Box<dyn CredentialStore>,
}

impl Context {
    /// Build a GitHub-backed context from environment configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository settings are missing or invalid.
    pub fn from_env(credentials: impl CredentialStore + 'static) -> Result<Self, CommandError> {
        let config = ContentRepoConfig::from_env()?;
        tracing::debug!(owner = %config.owner, repo = %config.repo, "Content repository");
        let store = GitHubContentStore::new(&config)?;
        Ok(Self::new(store, credentials))
    }
}

impl<S: ContentStore> Context<S> {
    pub fn new(store: S, credentials: impl CredentialStore + 'static) -> Self {
        Self {
            store,
            credentials: Box::new(credentials),
        }
    }

    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The token from the token file, falling back to `GITHUB_TOKEN`.
    ///
    /// # Errors
    ///
    /// [`CommandError::NoCredential`] if neither is set.
    pub fn credential(&self) -> Result<SecretString, CommandError> {
        if let Some(token) = self.credentials.get()? {
            return Ok(token);
        }
        std::env::var("GITHUB_TOKEN")
            .ok()
            .filter(|t| !t.trim().is_empty())
            .map(SecretString::from)
            .ok_or(CommandError::NoCredential)
    }

    /// Credential plus a session hydrated from the store.
    ///
    /// # Errors
    ///
    /// Returns the credential or store error.
    pub async fn hydrated(&self) -> Result<(EditSession, SecretString), CommandError> {
        let credential = self.credential()?;
        let mut session = EditSession::new();
        session.hydrate(&self.store, &credential).await?;
        Ok((session, credential))
    }

    /// Save the session and report the new token.
    ///
    /// # Errors
    ///
    /// Returns the session error; a conflict means the remote changed
    /// after this command read it.
    pub async fn save(
        &self,
        session: &mut EditSession,
        credential: &SecretString,
    ) -> Result<VersionToken, CommandError> {
        match session.save(&self.store, credential).await {
            Ok(token) => {
                tracing::info!(token = %token.short(), "Saved");
                Ok(token)
            }
            Err(SessionError::Store(StoreError::Conflict(detail))) => {
                tracing::warn!("Remote content changed while editing; nothing was written. Re-run the command.");
                Err(StoreError::Conflict(detail).into())
            }
            Err(e) => Err(e.into()),
        }
    }
}
