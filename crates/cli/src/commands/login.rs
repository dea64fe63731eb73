//! Store the access token used by the other commands.

use artistic_gurl_admin::{CredentialStore, FileCredentialStore};
use secrecy::SecretString;

use super::CommandError;

/// Write `token` to the token file.
///
/// # Errors
///
/// [`CommandError::EmptyToken`] for a blank token, or the file error.
pub fn run(store: &FileCredentialStore, token: &str) -> Result<(), CommandError> {
    let token = token.trim();
    if token.is_empty() {
        return Err(CommandError::EmptyToken);
    }
    store.set(SecretString::from(token.to_string()))?;
    tracing::info!(path = %store.path().display(), "Token stored");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;

    use super::*;

    #[test]
    fn test_login_writes_trimmed_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token"));
        run(&store, "  ghp_abc123\n").unwrap();
        assert_eq!(store.get().unwrap().unwrap().expose_secret(), "ghp_abc123");
    }

    #[test]
    fn test_login_rejects_blank_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileCredentialStore::new(dir.path().join("token"));
        assert!(matches!(run(&store, "   "), Err(CommandError::EmptyToken)));
        assert!(store.get().unwrap().is_none());
    }
}
