//! GitHub contents API client.
//!
//! Reads and writes single files through `GET`/`PUT
//! /repos/{owner}/{repo}/contents/{path}`. Writes to an existing file must
//! carry the `sha` of the revision being replaced; the API answers 409 when
//! it is no longer current.

use artistic_gurl_core::{ContentDocument, VersionToken};
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};
use url::Url;

use super::{
    AssetLayout, AssetReference, ContentStore, Snapshot, StoreError, decode_base64_document,
    encode_base64, encode_document,
};
use crate::config::ContentRepoConfig;

/// Contents API version header value.
const API_VERSION: &str = "2022-11-28";

/// Longest slice of an error body kept in error messages.
const MAX_ERROR_BODY: usize = 200;

/// What kind of write a `PUT` is, for status mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operation {
    Read,
    Save,
    Upload,
}

#[derive(Debug, Deserialize)]
struct ContentsFile {
    sha: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    encoding: Option<String>,
}

#[derive(Debug, Serialize)]
struct PutRequest<'a> {
    message: &'a str,
    content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    branch: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct PutResponse {
    content: PutContent,
}

#[derive(Debug, Deserialize)]
struct PutContent {
    sha: String,
    path: String,
    #[serde(default)]
    download_url: Option<String>,
}

/// Content store over the GitHub contents API.
///
/// Cheap to clone; holds no document state.
#[derive(Clone)]
pub struct GitHubContentStore {
    client: Client,
    api_base_url: Url,
    owner: String,
    repo: String,
    document_path: String,
    branch: Option<String>,
    commit_message: String,
    assets: AssetLayout,
}

impl std::fmt::Debug for GitHubContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubContentStore")
            .field("api_base_url", &self.api_base_url.as_str())
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("document_path", &self.document_path)
            .field("branch", &self.branch)
            .finish_non_exhaustive()
    }
}

impl GitHubContentStore {
    /// Create a client for the configured repository.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Transport`] if the HTTP client fails to build.
    pub fn new(config: &ContentRepoConfig) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github+json"));
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));

        let client = Client::builder()
            .default_headers(headers)
            .user_agent(concat!("artistic-gurl-admin/", env!("CARGO_PKG_VERSION")))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StoreError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base_url: config.api_base_url.clone(),
            owner: config.owner.clone(),
            repo: config.repo.clone(),
            document_path: config.document_path.clone(),
            branch: config.branch.clone(),
            commit_message: config.commit_message.clone(),
            assets: AssetLayout::from_config(config),
        })
    }

    /// `{api}/repos/{owner}/{repo}/contents/{path}` with each segment encoded.
    fn contents_url(&self, path: &str) -> Result<Url, StoreError> {
        let encoded_path = path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        let raw = format!(
            "{}/repos/{}/{}/contents/{encoded_path}",
            self.api_base_url.as_str().trim_end_matches('/'),
            urlencoding::encode(&self.owner),
            urlencoding::encode(&self.repo),
        );
        Url::parse(&raw).map_err(|e| StoreError::Transport(format!("invalid contents URL: {e}")))
    }

    async fn put_file(
        &self,
        credential: &SecretString,
        path: &str,
        request: &PutRequest<'_>,
        operation: Operation,
    ) -> Result<PutContent, StoreError> {
        let url = self.contents_url(path)?;
        let response = self
            .client
            .put(url)
            .bearer_auth(credential.expose_secret())
            .json(request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response, path, operation).await);
        }

        let body: PutResponse = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("unexpected write response: {e}")))?;
        Ok(body.content)
    }
}

impl ContentStore for GitHubContentStore {
    #[instrument(skip_all, fields(repo = %self.repo, path = %self.document_path))]
    async fn fetch_document(&self, credential: &SecretString) -> Result<Snapshot, StoreError> {
        require_credential(credential)?;

        let mut url = self.contents_url(&self.document_path)?;
        if let Some(branch) = &self.branch {
            url.query_pairs_mut().append_pair("ref", branch);
        }

        let response = self
            .client
            .get(url)
            .bearer_auth(credential.expose_secret())
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, response, &self.document_path, Operation::Read).await);
        }

        let file: ContentsFile = response
            .json()
            .await
            .map_err(|e| StoreError::Transport(format!("unexpected read response: {e}")))?;

        let content = match (file.content.as_deref(), file.encoding.as_deref()) {
            (Some(content), None | Some("base64")) if !content.is_empty() => content,
            (_, encoding) => {
                return Err(StoreError::CorruptDocument(format!(
                    "contents API returned no inline base64 content (encoding: {})",
                    encoding.unwrap_or("none")
                )));
            }
        };

        let document = decode_base64_document(content)?;
        debug!(sha = %file.sha, products = document.products.len(), "Document fetched");

        Ok(Snapshot {
            document,
            token: VersionToken::new(file.sha),
        })
    }

    #[instrument(skip_all, fields(repo = %self.repo, path = %self.document_path, expected = %expected.short()))]
    async fn save_document(
        &self,
        credential: &SecretString,
        document: &ContentDocument,
        expected: &VersionToken,
    ) -> Result<VersionToken, StoreError> {
        require_credential(credential)?;

        let request = PutRequest {
            message: &self.commit_message,
            content: encode_base64(&encode_document(document)?),
            sha: Some(expected.as_str()),
            branch: self.branch.as_deref(),
        };

        let written = self
            .put_file(credential, &self.document_path, &request, Operation::Save)
            .await?;
        info!(sha = %written.sha, "Document committed");

        Ok(VersionToken::new(written.sha))
    }

    #[instrument(skip_all, fields(repo = %self.repo, name = %suggested_name, size = bytes.len()))]
    async fn upload_asset(
        &self,
        credential: &SecretString,
        bytes: &[u8],
        suggested_name: &str,
    ) -> Result<AssetReference, StoreError> {
        require_credential(credential)?;

        let path = self
            .assets
            .asset_path(chrono::Utc::now().timestamp_millis(), suggested_name);
        let message = format!("Upload image {suggested_name}");
        let request = PutRequest {
            message: &message,
            content: encode_base64(bytes),
            sha: None,
            branch: self.branch.as_deref(),
        };

        let written = self
            .put_file(credential, &path, &request, Operation::Upload)
            .await?;
        info!(path = %written.path, "Asset committed");

        Ok(self
            .assets
            .reference(&written.path, written.download_url.as_deref()))
    }
}

fn require_credential(credential: &SecretString) -> Result<(), StoreError> {
    if credential.expose_secret().trim().is_empty() {
        return Err(StoreError::Unauthorized("no credential supplied".to_string()));
    }
    Ok(())
}

fn transport_error(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        warn!(error = %err, "Contents API request timed out");
        StoreError::Transport("request timed out".to_string())
    } else {
        error!(error = %err, "Contents API request failed");
        StoreError::Transport(err.to_string())
    }
}

/// Map a non-success response to a store error.
async fn status_error(
    status: StatusCode,
    response: reqwest::Response,
    path: &str,
    operation: Operation,
) -> StoreError {
    let body = response.text().await.unwrap_or_default();
    let detail: String = body.chars().take(MAX_ERROR_BODY).collect();

    match (status, operation) {
        (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN, _) => {
            StoreError::Unauthorized(format!("contents API refused the credential ({status})"))
        }
        (StatusCode::NOT_FOUND, _) => StoreError::NotFound(path.to_string()),
        (StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY, Operation::Save) => {
            warn!(status = %status, "Remote document changed since it was read");
            StoreError::Conflict(format!("{path} was modified remotely"))
        }
        (StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY, Operation::Upload) => {
            StoreError::Transport(format!("asset {path} already exists ({status})"))
        }
        _ => {
            error!(status = %status, body = %detail, "Unexpected contents API response");
            StoreError::Transport(format!("contents API returned {status}: {detail}"))
        }
    }
}
