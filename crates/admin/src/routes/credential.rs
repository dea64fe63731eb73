//! Credential handlers: the operator supplies the API token here.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::state::AppState;
use crate::store::ContentStore;

/// Build the credential router.
pub fn router<S>() -> Router<AppState<S>>
where
    S: ContentStore + 'static,
{
    Router::new().route("/api/credential", get(status::<S>).put(set::<S>))
}

/// Request to set the token.
#[derive(Deserialize)]
pub struct SetCredentialRequest {
    pub token: String,
}

/// Whether a token is set. The token itself is never returned.
#[derive(Debug, Serialize)]
pub struct CredentialStatus {
    pub configured: bool,
}

/// Report whether a token is set.
///
/// # Errors
///
/// Returns an error if the credential backend cannot be read.
pub async fn status<S: ContentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<CredentialStatus>, AppError> {
    Ok(Json(CredentialStatus {
        configured: state.credentials().get()?.is_some(),
    }))
}

/// Replace the token.
///
/// # Errors
///
/// Returns 400 for a blank token, or an error if the backend cannot be
/// written.
pub async fn set<S: ContentStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<SetCredentialRequest>,
) -> Result<StatusCode, AppError> {
    let token = body.token.trim();
    if token.is_empty() {
        return Err(AppError::BadRequest("token must not be empty".to_string()));
    }
    state.credentials().set(SecretString::from(token.to_string()))?;
    tracing::info!("Credential updated");
    Ok(StatusCode::NO_CONTENT)
}
