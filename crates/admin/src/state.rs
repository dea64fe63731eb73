//! Application state shared across handlers.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::Mutex;

use crate::credentials::CredentialStore;
use crate::error::AppError;
use crate::session::EditSession;
use crate::store::{ContentStore, GitHubContentStore};

/// Application state shared across all handlers.
///
/// Holds the one edit session. Handlers lock it only around local state
/// changes, never across a store call.
pub struct AppState<S = GitHubContentStore> {
    inner: Arc<AppStateInner<S>>,
}

struct AppStateInner<S> {
    store: S,
    credentials: Arc<dyn CredentialStore>,
    session: Mutex<EditSession>,
}

impl<S> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ContentStore> AppState<S> {
    /// Create application state with an empty session.
    #[must_use]
    pub fn new(store: S, credentials: Arc<dyn CredentialStore>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                credentials,
                session: Mutex::new(EditSession::new()),
            }),
        }
    }

    /// The content store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// The credential backend.
    #[must_use]
    pub fn credentials(&self) -> &dyn CredentialStore {
        self.inner.credentials.as_ref()
    }

    /// The edit session.
    #[must_use]
    pub fn session(&self) -> &Mutex<EditSession> {
        &self.inner.session
    }

    /// The current credential.
    ///
    /// # Errors
    ///
    /// [`AppError::NoCredential`] if none was set, or the backend error.
    pub fn credential(&self) -> Result<SecretString, AppError> {
        self.credentials().get()?.ok_or(AppError::NoCredential)
    }
}
