//! Integration tests for Artistic Gurl content sync.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p artistic-gurl-integration-tests
//! ```
//!
//! No external services are needed: [`MockContentsApi`] serves the subset of
//! the GitHub contents API the store client uses, on an ephemeral localhost
//! port, backed by [`VersionedFiles`].
//!
//! # Test Categories
//!
//! - `github_store` - Store client against the mock API
//! - `edit_workflow` - Sessions, conflicts and uploads end to end
//! - `admin_api` - The admin HTTP API over a real socket

use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use artistic_gurl_admin::store::{PutError, VersionedFiles, decode_base64, encode_base64};
use artistic_gurl_admin::{ContentRepoConfig, GitHubContentStore};
use artistic_gurl_core::ContentDocument;
use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::get,
};
use serde::Deserialize;
use serde_json::json;
use tokio::task::JoinHandle;
use url::Url;

/// Repository owner the mock answers for.
pub const OWNER: &str = "codemdragon";
/// Repository name the mock answers for.
pub const REPO: &str = "artistic__gurl__";
/// The only token the mock accepts.
pub const TOKEN: &str = "ghp_integration_token";
/// Branch served when a request names none.
pub const DEFAULT_BRANCH: &str = "main";
/// Where the content document lives.
pub const DOCUMENT_PATH: &str = "public/db.json";

/// Width of the line-wrapped base64 the mock returns.
const BASE64_LINE: usize = 60;

/// A write the mock accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    pub path: String,
    pub message: String,
    pub branch: Option<String>,
}

struct MockState {
    files: Arc<VersionedFiles>,
    base_url: String,
    commits: Mutex<Vec<Commit>>,
    delay: Mutex<Option<Duration>>,
}

impl MockState {
    fn delay(&self) -> Option<Duration> {
        *self.delay.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process stand-in for the GitHub contents API.
///
/// The server stops when this value is dropped.
pub struct MockContentsApi {
    addr: SocketAddr,
    state: Arc<MockState>,
    server: JoinHandle<()>,
}

impl MockContentsApi {
    /// Start a server with no files.
    ///
    /// # Panics
    ///
    /// Panics if no local port can be bound.
    pub async fn start() -> Self {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind mock contents API");
        let addr = listener.local_addr().expect("Mock has no local address");

        let state = Arc::new(MockState {
            files: Arc::new(VersionedFiles::new()),
            base_url: format!("http://{addr}"),
            commits: Mutex::new(Vec::new()),
            delay: Mutex::new(None),
        });

        let app = Router::new()
            .route(
                "/repos/{owner}/{repo}/contents/{*path}",
                get(read_file).put(write_file),
            )
            .with_state(Arc::clone(&state));

        let server = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!(error = %e, "Mock contents API stopped");
            }
        });

        Self {
            addr,
            state,
            server,
        }
    }

    /// Start a server holding `document` at [`DOCUMENT_PATH`].
    ///
    /// # Panics
    ///
    /// Panics if the server cannot start or the document cannot be encoded.
    pub async fn with_document(document: &ContentDocument) -> Self {
        let api = Self::start().await;
        let body = document
            .to_pretty_json()
            .expect("Failed to encode seed document");
        api.files().insert(DOCUMENT_PATH, body);
        api
    }

    /// Base URL, usable as `CONTENT_API_BASE_URL`.
    ///
    /// # Panics
    ///
    /// Never in practice; the address always forms a valid URL.
    #[must_use]
    pub fn url(&self) -> Url {
        Url::parse(&self.state.base_url).expect("Mock URL is valid")
    }

    #[must_use]
    pub const fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Repository settings pointing at this server.
    #[must_use]
    pub fn config(&self) -> ContentRepoConfig {
        ContentRepoConfig::with_defaults(self.url(), OWNER, REPO)
    }

    /// A store client pointing at this server.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be built.
    #[must_use]
    pub fn store(&self) -> GitHubContentStore {
        GitHubContentStore::new(&self.config()).expect("Failed to build store client")
    }

    /// The files behind the API.
    #[must_use]
    pub fn files(&self) -> &Arc<VersionedFiles> {
        &self.state.files
    }

    /// Every accepted write, oldest first.
    #[must_use]
    pub fn commits(&self) -> Vec<Commit> {
        self.state
            .commits
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Hold every response back by `delay`.
    pub fn set_delay(&self, delay: Duration) {
        *self
            .state
            .delay
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(delay);
    }
}

impl Drop for MockContentsApi {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn api_error(status: StatusCode, message: &str) -> Response {
    (status, Json(json!({ "message": message }))).into_response()
}

/// Shared checks for both verbs: delay, credential, repository, branch.
async fn precheck(
    state: &MockState,
    headers: &HeaderMap,
    owner: &str,
    repo: &str,
    branch: Option<&str>,
) -> Result<(), Response> {
    if let Some(delay) = state.delay() {
        tokio::time::sleep(delay).await;
    }

    let expected = format!("Bearer {TOKEN}");
    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v == expected);
    if !authorized {
        return Err(api_error(StatusCode::UNAUTHORIZED, "Bad credentials"));
    }

    if owner != OWNER || repo != REPO {
        return Err(api_error(StatusCode::NOT_FOUND, "Not Found"));
    }
    if branch.is_some_and(|b| b != DEFAULT_BRANCH) {
        return Err(api_error(StatusCode::NOT_FOUND, "No commit found for the ref"));
    }
    Ok(())
}

fn download_url(state: &MockState, path: &str) -> String {
    format!("{}/raw/{OWNER}/{REPO}/{DEFAULT_BRANCH}/{path}", state.base_url)
}

fn wrap_lines(encoded: &str) -> String {
    encoded
        .as_bytes()
        .chunks(BASE64_LINE)
        .map(String::from_utf8_lossy)
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug, Deserialize)]
struct ReadQuery {
    #[serde(rename = "ref")]
    reference: Option<String>,
}

async fn read_file(
    State(state): State<Arc<MockState>>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    Query(query): Query<ReadQuery>,
    headers: HeaderMap,
) -> Response {
    if let Err(response) =
        precheck(&state, &headers, &owner, &repo, query.reference.as_deref()).await
    {
        return response;
    }

    let Some(file) = state.files.get(&path) else {
        return api_error(StatusCode::NOT_FOUND, "Not Found");
    };

    let name = path.rsplit('/').next().unwrap_or(&path).to_string();
    Json(json!({
        "type": "file",
        "encoding": "base64",
        "size": file.bytes.len(),
        "name": name,
        "path": path,
        "content": wrap_lines(&encode_base64(&file.bytes)),
        "sha": file.sha,
        "download_url": download_url(&state, &path),
    }))
    .into_response()
}

#[derive(Debug, Deserialize)]
struct WriteBody {
    message: String,
    content: String,
    sha: Option<String>,
    branch: Option<String>,
}

async fn write_file(
    State(state): State<Arc<MockState>>,
    Path((owner, repo, path)): Path<(String, String, String)>,
    headers: HeaderMap,
    Json(body): Json<WriteBody>,
) -> Response {
    if let Err(response) = precheck(&state, &headers, &owner, &repo, body.branch.as_deref()).await
    {
        return response;
    }

    let Ok(bytes) = decode_base64(&body.content) else {
        return api_error(StatusCode::BAD_REQUEST, "content is not valid Base64");
    };

    let created = body.sha.is_none();
    match state.files.put(&path, bytes, body.sha.as_deref()) {
        Ok(sha) => {
            let commit = Commit {
                path: path.clone(),
                message: body.message,
                branch: body.branch,
            };
            let message = commit.message.clone();
            state
                .commits
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push(commit);
            let status = if created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            let name = path.rsplit('/').next().unwrap_or(&path).to_string();
            (
                status,
                Json(json!({
                    "content": {
                        "name": name,
                        "path": path,
                        "sha": sha,
                        "download_url": download_url(&state, &path),
                    },
                    "commit": { "sha": sha, "message": message },
                })),
            )
                .into_response()
        }
        Err(PutError::ShaMismatch { .. }) => api_error(
            StatusCode::CONFLICT,
            &format!("{path} does not match {}", body.sha.unwrap_or_default()),
        ),
        Err(PutError::Missing(_)) => api_error(StatusCode::NOT_FOUND, "Not Found"),
        Err(PutError::AlreadyExists(_)) => api_error(
            StatusCode::UNPROCESSABLE_ENTITY,
            "Invalid request. \"sha\" wasn't supplied.",
        ),
    }
}

/// A small shop document: products 1 (Love) and 7 (Birthday).
///
/// # Panics
///
/// Never in practice; the fixture is valid.
#[must_use]
pub fn sample_document() -> ContentDocument {
    ContentDocument::parse(json!({
        "siteConfig": {
            "title": "Artistic Gurl",
            "announcement": "Handmade with love",
            "heroTitle": "Cards that pop",
            "heroSubtitle": "Made to order in Lahore",
            "ticker": ["Pop-up cards", "Custom orders"],
            "phone": "+92 300 0000000",
            "email": "hello@artisticgurl.pk",
            "instagram": "artistic__gurl__"
        },
        "categories": ["Love", "Birthday"],
        "products": [
            { "id": 1, "title": "Pop-up Heart", "price": "PKR 1500", "category": "Love",
              "desc": "A heart that jumps out", "color": "bg-pink-50", "icon": "Heart" },
            { "id": 7, "title": "Confetti", "price": "PKR 900", "category": "Birthday",
              "desc": "Colourful shaker card", "color": "bg-yellow-50", "icon": "Star" }
        ],
        "contact": {
            "email": "hello@artisticgurl.pk",
            "phone": "+92 300 0000000",
            "instagram": "artistic__gurl__"
        },
        "reviews": [{ "name": "Sana", "rating": 5, "text": "Lovely!" }],
        "theme": { "accent": "#f472b6" }
    }))
    .expect("Sample document is valid")
}

/// The token the integration tests authenticate with.
#[must_use]
pub fn credential() -> secrecy::SecretString {
    secrecy::SecretString::from(TOKEN)
}
