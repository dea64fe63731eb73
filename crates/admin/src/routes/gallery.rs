//! Gallery preview over the current draft.

use artistic_gurl_core::{CategoryFilter, GalleryFilter, Product};
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::SessionError;
use crate::state::AppState;
use crate::store::ContentStore;

/// Build the gallery router.
pub fn router<S>() -> Router<AppState<S>>
where
    S: ContentStore + 'static,
{
    Router::new().route("/api/gallery", get(gallery::<S>))
}

/// Query string for the gallery.
#[derive(Debug, Default, Deserialize)]
pub struct GalleryQuery {
    /// Category tab; missing or `All` shows everything.
    #[serde(default)]
    pub category: Option<String>,
    /// Search phrase.
    #[serde(default)]
    pub q: Option<String>,
}

impl From<GalleryQuery> for GalleryFilter {
    fn from(query: GalleryQuery) -> Self {
        Self {
            category: query
                .category
                .map_or(CategoryFilter::All, CategoryFilter::from),
            search: query.q,
        }
    }
}

/// Tabs plus the products the public gallery would show.
#[derive(Debug, Serialize)]
pub struct GalleryResponse {
    pub categories: Vec<String>,
    pub products: Vec<Product>,
}

/// Filter the draft's products the way the public gallery does.
///
/// # Errors
///
/// Returns an error if no document is loaded.
pub async fn gallery<S: ContentStore>(
    State(state): State<AppState<S>>,
    Query(query): Query<GalleryQuery>,
) -> Result<Json<GalleryResponse>, AppError> {
    let session = state.session().lock().await;
    let document = session.document().ok_or(SessionError::InvalidState {
        operation: "preview the gallery",
        state: session.state(),
    })?;

    let filter = GalleryFilter::from(query);
    Ok(Json(GalleryResponse {
        categories: document
            .gallery_categories()
            .into_iter()
            .map(str::to_string)
            .collect(),
        products: document
            .filter_products(&filter)
            .into_iter()
            .cloned()
            .collect(),
    }))
}
