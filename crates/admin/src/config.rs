//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `CONTENT_REPO_OWNER` - Owner of the repository holding the site content
//! - `CONTENT_REPO_NAME` - Repository holding the site content
//!
//! ## Optional
//! - `CONTENT_PATH` - Path of the content document (default: public/db.json)
//! - `CONTENT_BRANCH` - Branch to read and commit to (default: repository default)
//! - `CONTENT_API_BASE_URL` - Contents API base URL (default: <https://api.github.com>)
//! - `CONTENT_COMMIT_MESSAGE` - Commit message for document saves
//! - `ASSET_DIR` - Directory uploaded images are committed to (default: public/uploads)
//! - `ASSET_PUBLIC_ROOT` - Directory served as the site root (default: public)
//! - `ASSET_REFERENCE_STYLE` - `site_relative` (default) or `download_url`
//! - `REQUEST_TIMEOUT_SECS` - Timeout for each remote call (default: 30)
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 3001)
//! - `ADMIN_CREDENTIAL_FILE` - File the operator's token is persisted to
//! - `GITHUB_TOKEN` - Token to start with (otherwise supplied at runtime)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Trace sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_API_BASE_URL: &str = "https://api.github.com";
const DEFAULT_CONTENT_PATH: &str = "public/db.json";
const DEFAULT_COMMIT_MESSAGE: &str = "Update db.json from Admin Panel";
const DEFAULT_ASSET_DIR: &str = "public/uploads";
const DEFAULT_ASSET_PUBLIC_ROOT: &str = "public";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.0;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "xxx",
    "todo",
    "insert",
    "put-your",
    "ghp_...",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// How an uploaded asset is referenced from the content document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AssetReferenceStyle {
    /// Path relative to the deployed site root, e.g. `/uploads/17..._card.png`.
    #[default]
    SiteRelative,
    /// The absolute download URL returned by the contents API.
    DownloadUrl,
}

impl std::str::FromStr for AssetReferenceStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "site_relative" => Ok(Self::SiteRelative),
            "download_url" => Ok(Self::DownloadUrl),
            _ => Err(format!(
                "invalid asset reference style: {s} (expected site_relative or download_url)"
            )),
        }
    }
}

/// Where the content document lives and how commits are made.
#[derive(Debug, Clone)]
pub struct ContentRepoConfig {
    /// Contents API base URL
    pub api_base_url: Url,
    /// Repository owner
    pub owner: String,
    /// Repository name
    pub repo: String,
    /// Path of the content document inside the repository
    pub document_path: String,
    /// Branch to target (`None` = repository default branch)
    pub branch: Option<String>,
    /// Commit message used for document saves
    pub commit_message: String,
    /// Directory uploaded assets are committed to
    pub asset_dir: String,
    /// Directory served as the site root
    pub asset_public_root: String,
    /// How uploaded assets are referenced
    pub reference_style: AssetReferenceStyle,
    /// Timeout applied to every remote call
    pub request_timeout: Duration,
}

/// Admin application configuration.
#[derive(Clone)]
pub struct AdminConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Content repository configuration
    pub content: ContentRepoConfig,
    /// File the operator's token is persisted to (in memory if unset)
    pub credential_file: Option<PathBuf>,
    /// Token to start with
    pub initial_token: Option<SecretString>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl std::fmt::Debug for AdminConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("content", &self.content)
            .field("credential_file", &self.credential_file)
            .field(
                "initial_token",
                &self.initial_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("sentry_dsn", &self.sentry_dsn)
            .field("sentry_environment", &self.sentry_environment)
            .finish_non_exhaustive()
    }
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(&|key| std::env::var(key).ok())
    }

    fn from_lookup(env: &dyn Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let vars = Vars(env);

        let host = vars
            .or_default("ADMIN_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_HOST".to_string(), e.to_string()))?;
        let port = vars
            .or_default("ADMIN_PORT", "3001")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ADMIN_PORT".to_string(), e.to_string()))?;

        let content = ContentRepoConfig::from_vars(&vars)?;

        let initial_token = vars.optional("GITHUB_TOKEN").map(|token| {
            // A weak-looking token is still usable; the API decides
            if let Err(e) = validate_token_shape(&token, "GITHUB_TOKEN") {
                tracing::warn!("GITHUB_TOKEN validation warning: {e}");
            }
            SecretString::from(token)
        });

        let sentry_sample_rate = vars
            .optional("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = vars
            .optional("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(0.0);

        Ok(Self {
            host,
            port,
            content,
            credential_file: vars.optional("ADMIN_CREDENTIAL_FILE").map(PathBuf::from),
            initial_token,
            sentry_dsn: vars.optional("SENTRY_DSN"),
            sentry_environment: vars.optional("SENTRY_ENVIRONMENT"),
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl ContentRepoConfig {
    /// Load the content repository settings from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_vars(&Vars(&|key| std::env::var(key).ok()))
    }

    fn from_vars(vars: &Vars<'_>) -> Result<Self, ConfigError> {
        let api_base_url = Url::parse(&vars.or_default("CONTENT_API_BASE_URL", DEFAULT_API_BASE_URL))
            .map_err(|e| {
                ConfigError::InvalidEnvVar("CONTENT_API_BASE_URL".to_string(), e.to_string())
            })?;
        if api_base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidEnvVar(
                "CONTENT_API_BASE_URL".to_string(),
                "must be an http(s) base URL".to_string(),
            ));
        }

        let document_path = trim_slashes(&vars.or_default("CONTENT_PATH", DEFAULT_CONTENT_PATH));
        if document_path.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "CONTENT_PATH".to_string(),
                "must not be empty".to_string(),
            ));
        }

        let reference_style = vars
            .optional("ASSET_REFERENCE_STYLE")
            .map(|s| s.parse::<AssetReferenceStyle>())
            .transpose()
            .map_err(|e| ConfigError::InvalidEnvVar("ASSET_REFERENCE_STYLE".to_string(), e))?
            .unwrap_or_default();

        let timeout_secs = vars
            .or_default("REQUEST_TIMEOUT_SECS", &DEFAULT_TIMEOUT_SECS.to_string())
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
            })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            api_base_url,
            owner: vars.required("CONTENT_REPO_OWNER")?,
            repo: vars.required("CONTENT_REPO_NAME")?,
            document_path,
            branch: vars.optional("CONTENT_BRANCH"),
            commit_message: vars.or_default("CONTENT_COMMIT_MESSAGE", DEFAULT_COMMIT_MESSAGE),
            asset_dir: trim_slashes(&vars.or_default("ASSET_DIR", DEFAULT_ASSET_DIR)),
            asset_public_root: trim_slashes(
                &vars.or_default("ASSET_PUBLIC_ROOT", DEFAULT_ASSET_PUBLIC_ROOT),
            ),
            reference_style,
            request_timeout: Duration::from_secs(timeout_secs),
        })
    }

    /// Settings for a repository with every optional value at its default.
    #[must_use]
    pub fn with_defaults(api_base_url: Url, owner: &str, repo: &str) -> Self {
        Self {
            api_base_url,
            owner: owner.to_string(),
            repo: repo.to_string(),
            document_path: DEFAULT_CONTENT_PATH.to_string(),
            branch: None,
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            asset_dir: DEFAULT_ASSET_DIR.to_string(),
            asset_public_root: DEFAULT_ASSET_PUBLIC_ROOT.to_string(),
            reference_style: AssetReferenceStyle::default(),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment lookup with the usual required/optional/default helpers.
struct Vars<'a>(&'a dyn Fn(&str) -> Option<String>);

impl Vars<'_> {
    /// Get a required variable.
    fn required(&self, key: &str) -> Result<String, ConfigError> {
        self.optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an optional variable; empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn trim_slashes(path: &str) -> String {
    path.trim().trim_matches('/').to_string()
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.chars().count() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)] // Character count will never exceed f64 precision
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Check that a token is not a placeholder and looks randomly generated.
fn validate_token_shape(token: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = token.to_lowercase();

    for pattern in PLACEHOLDER_PATTERNS {
        if lower.contains(pattern) {
            return Err(ConfigError::InvalidEnvVar(
                var_name.to_string(),
                format!("appears to be a placeholder (contains '{pattern}')"),
            ));
        }
    }

    let entropy = shannon_entropy(token);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InvalidEnvVar(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
            ),
        ));
    }

    Ok(())
}
