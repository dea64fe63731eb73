//! Editing commands: one hydrate, one mutation, one conditional save.

use artistic_gurl_admin::{ContentStore, ProductPatch, SiteField};
use artistic_gurl_core::{Product, ProductId, VersionToken};

use super::content::print_product;
use super::{CommandError, Context};

/// Set a text field and save.
///
/// # Errors
///
/// Returns the credential, store or conflict error.
pub async fn set_field<S: ContentStore>(
    ctx: &Context<S>,
    field: SiteField,
    value: &str,
) -> Result<Option<VersionToken>, CommandError> {
    let (mut session, credential) = ctx.hydrated().await?;
    if !session.set_field(field, value)? {
        tracing::info!(%field, "Field already has that value; nothing to save");
        return Ok(None);
    }
    ctx.save(&mut session, &credential).await.map(Some)
}

/// Add a product with the next free ID, apply `patch` to it, and save.
///
/// # Errors
///
/// Returns the credential, store or conflict error.
pub async fn add_product<S: ContentStore>(
    ctx: &Context<S>,
    patch: ProductPatch,
) -> Result<Product, CommandError> {
    let (mut session, credential) = ctx.hydrated().await?;
    let id = session.add_product()?.id;
    session.update_product(id, &patch)?;
    let product = session
        .document()
        .and_then(|d| d.product(id))
        .cloned()
        .ok_or(CommandError::ProductNotFound(id))?;
    ctx.save(&mut session, &credential).await?;
    print_product(&product);
    Ok(product)
}

/// Patch product `id` and save.
///
/// # Errors
///
/// [`CommandError::ProductNotFound`] if `id` is not in the document, or the
/// credential, store or conflict error.
pub async fn update_product<S: ContentStore>(
    ctx: &Context<S>,
    id: ProductId,
    patch: &ProductPatch,
) -> Result<Product, CommandError> {
    let (mut session, credential) = ctx.hydrated().await?;
    if !session.update_product(id, patch)? {
        return Err(CommandError::ProductNotFound(id));
    }
    let product = session
        .document()
        .and_then(|d| d.product(id))
        .cloned()
        .ok_or(CommandError::ProductNotFound(id))?;
    ctx.save(&mut session, &credential).await?;
    print_product(&product);
    Ok(product)
}

/// Remove product `id` and save.
///
/// # Errors
///
/// [`CommandError::ProductNotFound`] if `id` is not in the document, or the
/// credential, store or conflict error.
pub async fn remove_product<S: ContentStore>(
    ctx: &Context<S>,
    id: ProductId,
) -> Result<VersionToken, CommandError> {
    let (mut session, credential) = ctx.hydrated().await?;
    if !session.remove_product(id)? {
        return Err(CommandError::ProductNotFound(id));
    }
    ctx.save(&mut session, &credential).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use artistic_gurl_core::IconToken;
    use secrecy::SecretString;

    use super::*;
    use crate::commands::test_support::{TOKEN, context};

    fn id(n: u32) -> ProductId {
        ProductId::new(n).unwrap()
    }

    async fn remote_products<S: ContentStore>(ctx: &Context<S>) -> Vec<Product> {
        ctx.store()
            .fetch_document(&SecretString::from(TOKEN))
            .await
            .unwrap()
            .document
            .products
    }

    #[tokio::test]
    async fn test_set_field_saves() {
        let ctx = context();
        let before = ctx.store().current_token().unwrap();
        let token = set_field(&ctx, SiteField::Announcement, "Eid orders close Friday")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(token, before);

        let remote = ctx
            .store()
            .fetch_document(&SecretString::from(TOKEN))
            .await
            .unwrap();
        assert_eq!(
            remote.document.site_config.announcement,
            "Eid orders close Friday"
        );
    }

    #[tokio::test]
    async fn test_set_field_unchanged_skips_save() {
        let ctx = context();
        let before = ctx.store().current_token();
        let saved = set_field(&ctx, SiteField::SiteTitle, "Artistic Gurl")
            .await
            .unwrap();
        assert!(saved.is_none());
        assert_eq!(ctx.store().current_token(), before);
    }

    #[tokio::test]
    async fn test_add_product_uses_next_id() {
        let ctx = context();
        let patch = ProductPatch {
            title: Some("Shaker Card".to_string()),
            icon: Some(IconToken::Gift),
            ..ProductPatch::default()
        };
        let product = add_product(&ctx, patch).await.unwrap();
        assert_eq!(product.id, id(8));
        assert_eq!(product.title, "Shaker Card");

        let products = remote_products(&ctx).await;
        assert_eq!(products.len(), 3);
        assert_eq!(products.last().unwrap().id, id(8));
    }

    #[tokio::test]
    async fn test_update_missing_product() {
        let ctx = context();
        let before = ctx.store().current_token();
        let err = update_product(&ctx, id(42), &ProductPatch::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::ProductNotFound(p) if p == id(42)));
        assert_eq!(ctx.store().current_token(), before);
    }

    #[tokio::test]
    async fn test_remove_product_persists() {
        let ctx = context();
        remove_product(&ctx, id(1)).await.unwrap();
        let products = remote_products(&ctx).await;
        assert_eq!(products.len(), 1);
        assert_eq!(products.first().unwrap().id, id(7));
    }
}
