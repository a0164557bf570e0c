//! Secrets management for cherrypicker
//!
//! The GitHub token is kept out of the main config file. The secrets file
//! lives at `~/.config/cherrypicker/secrets.toml` and must not be readable by
//! group or others on Unix.
//!
//! Loading priority:
//! 1. `GITHUB_TOKEN` environment variable
//! 2. Secrets file

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{Error, Result};

const TEMPLATE: &str = r#"# cherrypicker secrets
# Do not commit this file. It must stay chmod 600.

[github]
# Token of the bot account. Needs repo scope to fork, push and open PRs.
token = ""
"#;

/// Secrets structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Secrets {
    pub github: GitHubSecrets,
}

/// GitHub-related secrets
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct GitHubSecrets {
    /// Token of the bot account
    pub token: Option<String>,
}

impl Secrets {
    /// Load secrets from the default location
    ///
    /// Returns empty secrets if the file doesn't exist
    pub fn load() -> Result<Self> {
        match Self::default_secrets_path() {
            Some(path) if path.exists() => Self::load_from_file(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load secrets from a specific file, refusing world/group readable files
    pub fn load_from_file(path: &Path) -> Result<Self> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;

            let mode = std::fs::metadata(path)
                .map_err(Error::Io)?
                .permissions()
                .mode();
            if mode & 0o077 != 0 {
                return Err(Error::Config(format!(
                    "Secrets file {} has insecure permissions {:o}. Please run: chmod 600 {}",
                    path.display(),
                    mode & 0o777,
                    path.display()
                )));
            }
        }

        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        let mut secrets: Secrets = toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse secrets: {}", e)))?;

        if let Some(ref mut token) = secrets.github.token {
            *token = token.trim().to_string();
        }

        Ok(secrets)
    }

    /// Returns `~/.config/cherrypicker/secrets.toml` on Unix
    pub fn default_secrets_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cherrypicker").join("secrets.toml"))
    }

    /// GitHub token, `GITHUB_TOKEN` winning over the secrets file
    pub fn github_token(&self) -> Option<String> {
        if let Ok(token) = std::env::var("GITHUB_TOKEN") {
            let token = token.trim().to_string();
            if !token.is_empty() {
                debug!("Using GitHub token from GITHUB_TOKEN environment variable");
                return Some(token);
            }
        }

        self.github
            .token
            .as_ref()
            .filter(|t| !t.is_empty())
            .cloned()
    }

    /// Like [`Secrets::github_token`] but a missing token is an error
    pub fn require_github_token(&self) -> Result<String> {
        self.github_token().ok_or_else(|| {
            Error::Config(
                "GitHub token not found. Set GITHUB_TOKEN or run `cherrypicker init-secrets`"
                    .to_string(),
            )
        })
    }

    /// Write a template secrets file at the default location
    pub fn create_template() -> Result<PathBuf> {
        let path = Self::default_secrets_path()
            .ok_or_else(|| Error::Config("Could not determine secrets path".to_string()))?;
        Self::create_template_at(&path)?;
        Ok(path)
    }

    /// Write a template secrets file at `path` with 0600 permissions
    ///
    /// Never overwrites an existing file.
    pub fn create_template_at(path: &Path) -> Result<()> {
        if path.exists() {
            return Err(Error::Config(format!("Secrets file already exists at {}", path.display())));
        }

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(Error::Io)?;
        }

        std::fs::write(path, TEMPLATE).map_err(Error::Io)?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
                .map_err(Error::Io)?;
        }

        warn!(path = %path.display(), "Created secrets template - add the bot token before use");
        Ok(())
    }
}
