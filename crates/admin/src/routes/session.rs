//! Edit session handlers: hydrate, field edits, save and conflict resolution.

use artistic_gurl_core::{ContentDocument, VersionToken, Violation};
use axum::{
    Json, Router,
    extract::State,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::{EditSession, SaveRequest, SessionState, SiteField};
use crate::state::AppState;
use crate::store::ContentStore;

/// Build the session router.
pub fn router<S>() -> Router<AppState<S>>
where
    S: ContentStore + 'static,
{
    Router::new()
        .route("/api/session", get(show::<S>).delete(discard::<S>))
        .route("/api/session/hydrate", post(hydrate::<S>))
        .route("/api/session/fields", patch(set_field::<S>))
        .route("/api/session/save", post(save::<S>))
        .route(
            "/api/session/adopt-remote-version",
            post(adopt_remote_version::<S>),
        )
}

/// Everything the admin screen needs to render the session.
#[derive(Debug, Serialize)]
pub struct SessionView {
    pub state: SessionState,
    pub editable: bool,
    pub token: Option<VersionToken>,
    pub document: Option<ContentDocument>,
    pub findings: Vec<Violation>,
    /// Uploaded images waiting for the draft to become editable.
    pub pending_images: usize,
}

impl From<&EditSession> for SessionView {
    fn from(session: &EditSession) -> Self {
        Self {
            state: session.state(),
            editable: session.is_editable(),
            token: session.token().cloned(),
            document: session.document().cloned(),
            findings: session.findings(),
            pending_images: session.pending_images(),
        }
    }
}

/// Request to set a text field.
#[derive(Debug, Deserialize)]
pub struct SetFieldRequest {
    pub field: SiteField,
    pub value: String,
}

/// Result of a field edit.
#[derive(Debug, Serialize)]
pub struct SetFieldResponse {
    pub changed: bool,
    pub state: SessionState,
}

/// Result of a save or adopt.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub state: SessionState,
    pub token: VersionToken,
}

/// Show the session.
pub async fn show<S: ContentStore>(State(state): State<AppState<S>>) -> Json<SessionView> {
    let session = state.session().lock().await;
    Json(SessionView::from(&*session))
}

/// Drop the draft without saving.
///
/// # Errors
///
/// Returns an error while a save is in flight.
pub async fn discard<S: ContentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<SessionView>, AppError> {
    let mut session = state.session().lock().await;
    session.discard()?;
    Ok(Json(SessionView::from(&*session)))
}

/// Load the remote document, replacing any local draft.
///
/// # Errors
///
/// Returns an error if no credential is set, a save is in flight, or the
/// fetch fails (the session is then unchanged).
pub async fn hydrate<S: ContentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<SessionView>, AppError> {
    let credential = state.credential()?;
    state.session().lock().await.begin_hydrate()?;

    let snapshot = state.store().fetch_document(&credential).await?;

    let mut session = state.session().lock().await;
    session.finish_hydrate(snapshot)?;
    Ok(Json(SessionView::from(&*session)))
}

/// Set one text field of the draft.
///
/// # Errors
///
/// Returns an error unless the session is editable.
pub async fn set_field<S: ContentStore>(
    State(state): State<AppState<S>>,
    Json(body): Json<SetFieldRequest>,
) -> Result<Json<SetFieldResponse>, AppError> {
    let mut session = state.session().lock().await;
    let changed = session.set_field(body.field, &body.value)?;
    Ok(Json(SetFieldResponse {
        changed,
        state: session.state(),
    }))
}

/// Commit the draft, conditioned on the token it was loaded at.
///
/// The store call and its bookkeeping run in their own task, so a dropped
/// request still returns the session to a settled state.
///
/// # Errors
///
/// Returns 409 `conflict` if the remote document changed (the session is
/// then `conflict_pending`), 409 `invalid_state` if nothing is loaded or a
/// save is already running, or the store error.
pub async fn save<S: ContentStore + 'static>(
    State(state): State<AppState<S>>,
) -> Result<Json<TokenResponse>, AppError> {
    let credential = state.credential()?;
    let request = state.session().lock().await.begin_save()?;

    let token = match request {
        SaveRequest::UpToDate(token) => token,
        SaveRequest::Pending { document, expected } => {
            let task_state = state.clone();
            tokio::spawn(async move {
                let outcome = task_state
                    .store()
                    .save_document(&credential, &document, &expected)
                    .await;
                task_state.session().lock().await.complete_save(outcome)
            })
            .await
            .map_err(|e| AppError::Internal(format!("save task failed: {e}")))??
        }
    };

    let session = state.session().lock().await;
    Ok(Json(TokenResponse {
        state: session.state(),
        token,
    }))
}

/// After a conflict, keep the local draft and take the remote token so the
/// next save overwrites the remote revision.
///
/// # Errors
///
/// Returns an error unless the session is `conflict_pending`, or the fetch
/// error.
pub async fn adopt_remote_version<S: ContentStore>(
    State(state): State<AppState<S>>,
) -> Result<Json<TokenResponse>, AppError> {
    let credential = state.credential()?;
    state.session().lock().await.begin_adopt()?;

    let snapshot = state.store().fetch_document(&credential).await?;

    let mut session = state.session().lock().await;
    let token = session.finish_adopt(snapshot.token)?.clone();
    Ok(Json(TokenResponse {
        state: session.state(),
        token,
    }))
}
