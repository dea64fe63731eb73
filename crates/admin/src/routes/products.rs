//! Product handlers: add, patch, remove and image upload on the draft.

use artistic_gurl_core::{Product, ProductId};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State},
    http::StatusCode,
    routing::{patch, post},
};

use crate::error::AppError;
use crate::session::ProductPatch;
use crate::state::AppState;
use crate::store::ContentStore;
use crate::upload::{UploadOutcome, begin_upload, finish_upload};

/// Largest image accepted for upload.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Build the products router.
pub fn router<S>() -> Router<AppState<S>>
where
    S: ContentStore + 'static,
{
    Router::new()
        .route("/api/session/products", post(add::<S>))
        .route(
            "/api/session/products/{id}",
            patch(update::<S>).delete(remove::<S>),
        )
        .route(
            "/api/session/products/{id}/image",
            post(upload_image::<S>).layer(DefaultBodyLimit::max(MAX_IMAGE_BYTES)),
        )
}

/// Append a placeholder product with the next free ID.
///
/// # Errors
///
/// Returns an error unless the session is editable.
pub async fn add<S: ContentStore>(
    State(state): State<AppState<S>>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let mut session = state.session().lock().await;
    let product = session.add_product()?.clone();
    Ok((StatusCode::CREATED, Json(product)))
}

/// Apply a partial update to a product.
///
/// # Errors
///
/// Returns 404 if the product is not in the draft, or an error unless the
/// session is editable.
pub async fn update<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
    Json(patch): Json<ProductPatch>,
) -> Result<Json<Product>, AppError> {
    let mut session = state.session().lock().await;
    if !session.update_product(id, &patch)? {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    session
        .document()
        .and_then(|document| document.product(id))
        .cloned()
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("product {id}")))
}

/// Remove a product from the draft.
///
/// # Errors
///
/// Returns 404 if the product is not in the draft, or an error unless the
/// session is editable.
pub async fn remove<S: ContentStore>(
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
) -> Result<StatusCode, AppError> {
    let mut session = state.session().lock().await;
    if session.remove_product(id)? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound(format!("product {id}")))
    }
}

/// Commit the multipart field `file` as a new asset and set it as the
/// product's image in the draft.
///
/// # Errors
///
/// Returns 400 for a missing or empty file, 404 for an unknown product, an
/// error unless the session is editable, or the upload error.
pub async fn upload_image<S: ContentStore + 'static>(
    State(state): State<AppState<S>>,
    Path(id): Path<ProductId>,
    mut multipart: Multipart,
) -> Result<Json<UploadOutcome>, AppError> {
    let credential = state.credential()?;
    {
        let session = state.session().lock().await;
        begin_upload(&session)?;
        if session.document().and_then(|d| d.product(id)).is_none() {
            return Err(AppError::NotFound(format!("product {id}")));
        }
    }

    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("image").to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("failed to read file: {e}")))?;
        upload = Some((file_name, bytes));
        break;
    }

    let Some((file_name, bytes)) = upload else {
        return Err(AppError::BadRequest("missing multipart field `file`".to_string()));
    };
    if bytes.is_empty() {
        return Err(AppError::BadRequest("uploaded file is empty".to_string()));
    }

    let task_state = state.clone();
    let outcome = tokio::spawn(async move {
        let reference = task_state
            .store()
            .upload_asset(&credential, &bytes, &file_name)
            .await?;
        let mut session = task_state.session().lock().await;
        Ok::<_, AppError>(finish_upload(&mut session, id, reference))
    })
    .await
    .map_err(|e| AppError::Internal(format!("upload task failed: {e}")))??;

    Ok(Json(outcome))
}
