//! GitHub API client using octocrab

use crate::{Error, Result};
use cherrypicker_core::Secrets;
use octocrab::Octocrab;
use tracing::info;

/// Default REST endpoint
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// GitHub API client shared across repositories
///
/// Unlike a per-repository client, every call names its `org`/`repo`, so a
/// single instance serves every event the bot receives.
#[derive(Clone)]
pub struct GitHubClient {
    client: Octocrab,
    http: reqwest::Client,
    token: String,
    api_base: String,
}

impl GitHubClient {
    /// Create a client authenticated with `token`
    pub fn new(token: impl Into<String>) -> Result<Self> {
        Self::with_api_base(token, DEFAULT_API_BASE)
    }

    /// Create a client against a GitHub Enterprise API root
    pub fn with_api_base(token: impl Into<String>, api_base: impl Into<String>) -> Result<Self> {
        let token = token.into();
        let api_base = api_base.into().trim_end_matches('/').to_string();

        let client = Octocrab::builder()
            .base_uri(api_base.as_str())
            .map_err(|e| Error::Parse(format!("Invalid API base {}: {}", api_base, e)))?
            .personal_token(token.clone())
            .build()
            .map_err(|e| Error::Auth(format!("Failed to create GitHub client: {}", e)))?;

        let http = reqwest::Client::builder()
            .user_agent("cherrypicker")
            .build()?;

        info!(api_base = %api_base, "Created GitHub client");

        Ok(Self {
            client,
            http,
            token,
            api_base,
        })
    }

    /// Create a client from loaded secrets
    ///
    /// Token is taken from (in priority order):
    /// 1. GITHUB_TOKEN environment variable
    /// 2. ~/.config/cherrypicker/secrets.toml
    pub fn from_secrets(secrets: &Secrets) -> Result<Self> {
        let token = secrets
            .require_github_token()
            .map_err(|e| Error::Auth(e.to_string()))?;
        Self::new(token)
    }

    /// Get the underlying octocrab client
    pub fn client(&self) -> &Octocrab {
        &self.client
    }

    pub(crate) fn http(&self) -> &reqwest::Client {
        &self.http
    }

    pub(crate) fn token(&self) -> &str {
        &self.token
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }
}

impl std::fmt::Debug for GitHubClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubClient")
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}
