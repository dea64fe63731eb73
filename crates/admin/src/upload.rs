//! Asset upload pipeline: commit an image, then point a product at it.
//!
//! The asset is committed to the store immediately. The product's `image`
//! field only changes in the draft, so the reference reaches the remote
//! document with the next save.

use artistic_gurl_core::ProductId;
use secrecy::SecretString;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::session::{EditSession, SessionError};
use crate::store::{AssetReference, ContentStore};

/// Result of an upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadOutcome {
    pub product: ProductId,
    pub reference: AssetReference,
    /// `false` when the product was gone (or the draft discarded) by the time
    /// the upload finished. The asset stays in the store.
    pub attached: bool,
}

/// Check that an upload for `product` may start.
///
/// # Errors
///
/// [`SessionError::InvalidState`] unless the session is hydrated or dirty.
pub fn begin_upload(session: &EditSession) -> Result<(), SessionError> {
    if session.is_editable() {
        Ok(())
    } else {
        Err(SessionError::InvalidState {
            operation: "upload an image",
            state: session.state(),
        })
    }
}

/// Attach an uploaded asset to `product` in the draft.
///
/// Never fails. If a save started while the upload was in flight the
/// reference is queued and lands once the save settles. If the product was
/// removed or the draft discarded, the reference is reported as orphaned.
pub fn finish_upload(
    session: &mut EditSession,
    product: ProductId,
    reference: AssetReference,
) -> UploadOutcome {
    let attached = match session.attach_image(product, &reference) {
        Ok(true) => {
            info!(product_id = %product, reference = %reference, "Image attached");
            true
        }
        Ok(false) => {
            warn!(product_id = %product, reference = %reference, "Product removed during upload; asset orphaned");
            false
        }
        Err(err) => {
            warn!(product_id = %product, reference = %reference, error = %err, "Image not attached; asset orphaned");
            false
        }
    };
    UploadOutcome {
        product,
        reference,
        attached,
    }
}

/// Upload `bytes` as a new asset and set it as `product`'s image.
///
/// # Errors
///
/// [`SessionError::InvalidState`] unless the session is editable, or the
/// store error if the upload fails (the draft is then unchanged).
#[instrument(skip(session, store, credential, bytes), fields(size = bytes.len()))]
pub async fn upload_and_attach<S: ContentStore>(
    session: &mut EditSession,
    store: &S,
    credential: &SecretString,
    bytes: &[u8],
    file_name: &str,
    product: ProductId,
) -> Result<UploadOutcome, SessionError> {
    begin_upload(session)?;
    let reference = store.upload_asset(credential, bytes, file_name).await?;
    Ok(finish_upload(session, product, reference))
}
