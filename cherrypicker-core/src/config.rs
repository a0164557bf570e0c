//! Configuration management for cherrypicker
//!
//! Configuration is loaded with the following priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables (CHERRYPICKER_*)
//! 3. Config file (~/.config/cherrypicker/config.toml)
//! 4. Default values

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Default command token recognised in comments
pub const DEFAULT_COMMAND: &str = "/cherrypick";

/// Default prefix for labels requesting a cherry-pick
pub const DEFAULT_LABEL_PREFIX: &str = "cherrypick/";

/// Identity the bot acts as
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BotConfig {
    /// Login owning the forks; also used to detect self-triggered requests
    pub login: String,

    /// Committer email for applied patches
    pub email: String,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            login: "ci-robot".to_string(),
            email: "ci-robot@users.noreply.github.com".to_string(),
        }
    }
}

/// Local git settings
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct GitConfig {
    /// Directory holding one shared clone per repository
    pub cache_dir: Option<PathBuf>,

    /// Host the repositories are cloned from and pushed to
    pub remote_host: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            remote_host: "github.com".to_string(),
        }
    }
}

/// Cherry-pick settings for a set of repositories
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RepoConfig {
    /// `org/repo` or bare `org` entries this block applies to
    pub repos: Vec<String>,

    /// Command token, e.g. `/cherrypick`
    pub command: String,

    /// Labels starting with this prefix request a cherry-pick; empty disables labels
    pub label_prefix: String,

    /// If set, `<prefix><branch>` is added to every created cherry-pick PR
    pub picked_label_prefix: Option<String>,

    /// Source PR labels that must not be copied
    pub exclude_labels: Vec<String>,

    /// Trust every commenter instead of checking org membership
    pub allow_all: bool,

    /// Open a tracking issue when the patch does not apply
    pub create_issue_on_conflict: bool,
}

impl Default for RepoConfig {
    fn default() -> Self {
        Self {
            repos: Vec::new(),
            command: DEFAULT_COMMAND.to_string(),
            label_prefix: DEFAULT_LABEL_PREFIX.to_string(),
            picked_label_prefix: None,
            exclude_labels: Vec::new(),
            allow_all: false,
            create_issue_on_conflict: false,
        }
    }
}

impl RepoConfig {
    /// Whether `label` is a cherry-pick request label
    pub fn is_trigger_label(&self, label: &str) -> bool {
        !self.label_prefix.is_empty() && label.starts_with(&self.label_prefix)
    }
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub bot: BotConfig,

    pub git: GitConfig,

    /// Per-repository settings
    pub cherrypicker: Vec<RepoConfig>,
}

impl Config {
    /// Load configuration from the default config file location
    ///
    /// Returns default config if file doesn't exist
    pub fn load() -> Result<Self> {
        if let Some(path) = Self::default_config_path() {
            if path.exists() {
                return Self::load_from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(Error::Io)?;
        toml::from_str(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse config: {}", e)))
    }

    /// Get the default config file path
    ///
    /// Returns `~/.config/cherrypicker/config.toml` on Unix
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("cherrypicker").join("config.toml"))
    }

    /// Apply environment variable overrides
    ///
    /// Supported variables:
    /// - CHERRYPICKER_BOT_LOGIN
    /// - CHERRYPICKER_BOT_EMAIL
    /// - CHERRYPICKER_CACHE_DIR
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(login) = std::env::var("CHERRYPICKER_BOT_LOGIN") {
            self.bot.login = login;
        }

        if let Ok(email) = std::env::var("CHERRYPICKER_BOT_EMAIL") {
            self.bot.email = email;
        }

        if let Ok(dir) = std::env::var("CHERRYPICKER_CACHE_DIR") {
            self.git.cache_dir = Some(PathBuf::from(dir));
        }

        self
    }

    /// Apply CLI flag overrides
    pub fn with_cli_overrides(
        mut self,
        bot_login: Option<String>,
        cache_dir: Option<PathBuf>,
    ) -> Self {
        if let Some(login) = bot_login {
            self.bot.login = login;
        }

        if let Some(dir) = cache_dir {
            self.git.cache_dir = Some(dir);
        }

        self
    }

    /// Load configuration with all overrides applied
    ///
    /// Priority: CLI > env > config file > defaults
    pub fn load_with_overrides(
        path: Option<&Path>,
        bot_login: Option<String>,
        cache_dir: Option<PathBuf>,
    ) -> Result<Self> {
        let base = match path {
            Some(path) => Self::load_from_file(path)?,
            None => Self::load()?,
        };

        Ok(base
            .with_env_overrides()
            .with_cli_overrides(bot_login, cache_dir))
    }

    /// Settings for `org/repo`
    ///
    /// An exact `org/repo` entry takes precedence over a bare `org` entry.
    pub fn for_repo(&self, org: &str, repo: &str) -> Option<&RepoConfig> {
        let full_name = format!("{}/{}", org, repo);

        self.cherrypicker
            .iter()
            .find(|c| c.repos.iter().any(|r| *r == full_name))
            .or_else(|| {
                self.cherrypicker
                    .iter()
                    .find(|c| c.repos.iter().any(|r| r == org))
            })
    }
}

/// Swappable configuration snapshot
///
/// Readers take one `Arc<Config>` per event; a reloader may `set` a new
/// snapshot at any time without disturbing in-flight work.
#[derive(Debug, Default)]
pub struct ConfigStore {
    current: RwLock<Arc<Config>>,
}

impl ConfigStore {
    pub fn new(config: Config) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    /// Current snapshot
    pub fn get(&self) -> Arc<Config> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the snapshot
    pub fn set(&self, config: Config) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(config);
    }
}
