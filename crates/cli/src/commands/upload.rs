//! Upload an image file and attach it to a product.

use std::path::Path;

use artistic_gurl_admin::{ContentStore, UploadOutcome, upload_and_attach};
use artistic_gurl_core::ProductId;
use serde_json::json;

use super::content::print_json;
use super::{CommandError, Context};

/// Upload `file`, point product `id` at it, and save.
///
/// The product is checked before anything is committed, so an unknown ID
/// never leaves an orphaned asset behind.
///
/// # Errors
///
/// [`CommandError::ProductNotFound`], [`CommandError::Io`] if the file cannot
/// be read, or the credential, store or conflict error.
pub async fn run<S: ContentStore>(
    ctx: &Context<S>,
    id: ProductId,
    file: &Path,
) -> Result<UploadOutcome, CommandError> {
    let bytes = tokio::fs::read(file)
        .await
        .map_err(|source| CommandError::Io {
            path: file.to_path_buf(),
            source,
        })?;
    let file_name = file
        .file_name()
        .map_or_else(|| "image".to_string(), |n| n.to_string_lossy().into_owned());

    let (mut session, credential) = ctx.hydrated().await?;
    if session.document().and_then(|d| d.product(id)).is_none() {
        return Err(CommandError::ProductNotFound(id));
    }

    let outcome = upload_and_attach(
        &mut session,
        ctx.store(),
        &credential,
        &bytes,
        &file_name,
        id,
    )
    .await?;
    let token = ctx.save(&mut session, &credential).await?;
    print_json(&json!({ "upload": &outcome, "token": token }));
    Ok(outcome)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::SecretString;

    use super::*;
    use crate::commands::test_support::{TOKEN, context};

    #[tokio::test]
    async fn test_upload_attaches_and_saves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("confetti card.png");
        std::fs::write(&path, b"\x89PNG\r\n\x1a\n").unwrap();

        let ctx = context();
        let id = ProductId::new(7).unwrap();
        let outcome = run(&ctx, id, &path).await.unwrap();
        assert!(outcome.attached);
        assert!(outcome.reference.as_str().starts_with("/uploads/"));

        let remote = ctx
            .store()
            .fetch_document(&SecretString::from(TOKEN))
            .await
            .unwrap();
        let image = remote.document.product(id).unwrap().image.clone();
        assert_eq!(image.as_deref(), Some(outcome.reference.as_str()));
    }

    #[tokio::test]
    async fn test_unknown_product_commits_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.png");
        std::fs::write(&path, b"x").unwrap();

        let ctx = context();
        let err = run(&ctx, ProductId::new(99).unwrap(), &path)
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ProductNotFound(_)));
        assert_eq!(ctx.store().files().paths().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_file() {
        let ctx = context();
        let err = run(&ctx, ProductId::new(7).unwrap(), Path::new("/nonexistent/a.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Io { .. }));
    }
}
