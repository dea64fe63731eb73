//! Custom order form: compose the message a visitor sends to the shop.

use artistic_gurl_core::CustomOrderRequest;
use axum::{Json, Router, routing::post};
use serde::Serialize;

use crate::error::AppError;
use crate::state::AppState;
use crate::store::ContentStore;

/// Build the custom order router.
pub fn router<S>() -> Router<AppState<S>>
where
    S: ContentStore + 'static,
{
    Router::new().route("/api/custom-order", post(compose))
}

#[derive(Debug, Serialize)]
pub struct ComposedMessage {
    pub message: String,
}

/// Compose the order message.
///
/// # Errors
///
/// Returns 400 if the name or details are blank.
pub async fn compose(Json(request): Json<CustomOrderRequest>) -> Result<Json<ComposedMessage>, AppError> {
    if !request.is_submittable() {
        return Err(AppError::BadRequest(
            "name and details are required".to_string(),
        ));
    }
    Ok(Json(ComposedMessage {
        message: request.message(),
    }))
}
