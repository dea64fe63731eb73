//! Where the operator's API token is kept between requests.
//!
//! The token is passed explicitly to every store call; nothing reads it from
//! a global. Two backends: process memory, and a file readable only by the
//! current user.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

/// Errors from a credential backend.
#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("credential file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Holds at most one bearer token.
pub trait CredentialStore: Send + Sync {
    /// The current token, if one was set.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self) -> Result<Option<SecretString>, CredentialError>;

    /// Replace the token.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn set(&self, token: SecretString) -> Result<(), CredentialError>;
}

/// Token held in memory for the life of the process.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    token: RwLock<Option<SecretString>>,
}

impl InMemoryCredentialStore {
    #[must_use]
    pub fn new(initial: Option<SecretString>) -> Self {
        Self {
            token: RwLock::new(initial),
        }
    }
}

impl std::fmt::Debug for InMemoryCredentialStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryCredentialStore")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self) -> Result<Option<SecretString>, CredentialError> {
        Ok(self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone())
    }

    fn set(&self, token: SecretString) -> Result<(), CredentialError> {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
        Ok(())
    }
}

/// Token persisted to a file (mode 0600 on Unix).
///
/// Surrounding whitespace in the file is ignored; an empty or missing file
/// means no token.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CredentialError {
        CredentialError::Io {
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Result<Option<SecretString>, CredentialError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => {
                let token = contents.trim();
                Ok((!token.is_empty()).then(|| SecretString::from(token)))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn set(&self, token: SecretString) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }

        let mut options = std::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }

        let mut file = options.open(&self.path).map_err(|e| self.io_error(e))?;
        std::io::Write::write_all(&mut file, token.expose_secret().as_bytes())
            .map_err(|e| self.io_error(e))?;
        tracing::info!(path = %self.path.display(), "Credential saved");
        Ok(())
    }
}
