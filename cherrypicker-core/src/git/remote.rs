//! Remote URLs and the clone cache layout

use std::path::{Path, PathBuf};

use crate::types::RepoKey;
use crate::{Error, Result};

/// Get the default repos cache directory
///
/// Returns `~/.cache/cherrypicker/repos`
pub fn default_repos_cache_dir() -> Result<PathBuf> {
    let cache_dir = dirs::cache_dir()
        .ok_or_else(|| Error::Config("Could not determine cache directory".to_string()))?;

    Ok(cache_dir.join("cherrypicker").join("repos"))
}

/// Where the shared clone of `repo` lives: `<cache>/<org>/<repo>`
pub fn repo_cache_path(cache_dir: &Path, repo: &RepoKey) -> PathBuf {
    cache_dir.join(&repo.org).join(&repo.repo)
}

/// URL of `owner/name` under `base`, e.g. `https://github.com`
pub fn remote_url(base: &str, owner: &str, name: &str) -> Result<url::Url> {
    let raw = format!("{}/{}/{}.git", base.trim_end_matches('/'), owner, name);
    url::Url::parse(&raw)
        .map_err(|e| Error::Config(format!("Invalid remote URL for {}/{}: {}", owner, name, e)))
}

/// [`remote_url`] with the token as credentials
///
/// Only HTTP(S) URLs carry credentials; other schemes are returned as is.
/// The result is meant for a single command line and must never be stored
/// in a clone's configuration.
pub fn authenticated_url(
    base: &str,
    owner: &str,
    name: &str,
    token: Option<&str>,
) -> Result<url::Url> {
    let mut url = remote_url(base, owner, name)?;

    let token = token.filter(|t| !t.is_empty());
    if let Some(token) = token {
        if matches!(url.scheme(), "http" | "https") {
            url.set_username("x-access-token")
                .and_then(|_| url.set_password(Some(token)))
                .map_err(|_| Error::Config(format!("Cannot embed credentials in {}", base)))?;
        }
    }

    Ok(url)
}

/// Replace any occurrence of the token in git output
pub(crate) fn redact(text: &str, token: Option<&str>) -> String {
    match token.filter(|t| !t.is_empty()) {
        Some(token) => text.replace(token, "<redacted>"),
        None => text.to_string(),
    }
}
