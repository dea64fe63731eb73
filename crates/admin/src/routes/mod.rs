//! HTTP route handlers for the admin API.
//!
//! # Route Structure
//!
//! ```text
//! GET    /health                              - Health check
//!
//! # Credential
//! GET    /api/credential                      - Whether a token is set
//! PUT    /api/credential                      - Set the token {token}
//!
//! # Session
//! GET    /api/session                         - State, token, draft, findings
//! DELETE /api/session                         - Discard the draft
//! POST   /api/session/hydrate                 - Load the remote document
//! PATCH  /api/session/fields                  - Set a text field {field, value}
//! POST   /api/session/save                    - Conditional save
//! POST   /api/session/adopt-remote-version    - Rebase draft on remote token
//!
//! # Products (draft)
//! POST   /api/session/products                - Add a placeholder product
//! PATCH  /api/session/products/{id}           - Patch a product
//! DELETE /api/session/products/{id}           - Remove a product
//! POST   /api/session/products/{id}/image     - Upload and attach an image
//!
//! # Site preview
//! GET    /api/gallery?category=&q=            - Filtered draft products
//! POST   /api/custom-order                    - Compose a custom order message
//! ```

pub mod credential;
pub mod custom_order;
pub mod gallery;
pub mod products;
pub mod session;

use axum::{Router, routing::get};

use crate::state::AppState;
use crate::store::ContentStore;

/// Build the complete router.
pub fn routes<S>() -> Router<AppState<S>>
where
    S: ContentStore + 'static,
{
    Router::new()
        .route("/health", get(health))
        .merge(credential::router())
        .merge(session::router())
        .merge(products::router())
        .merge(gallery::router())
        .merge(custom_order::router())
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not contact the store.
async fn health() -> &'static str {
    "ok"
}
