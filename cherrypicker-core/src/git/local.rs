//! Git layer over a cache of local clones
//!
//! Network operations and `git am` go through the git executable; branch
//! manipulation uses git2.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info, warn};

use super::remote::{authenticated_url, redact, remote_url, repo_cache_path};
use super::{ApplyOutcome, GitLayer, GitRepo};
use crate::config::Config;
use crate::types::{NewBranchSpec, RepoKey};
use crate::{Error, Result};

/// Captured result of one git invocation
struct GitOutput {
    success: bool,
    stdout: String,
    stderr: String,
}

impl GitOutput {
    fn combined(&self) -> String {
        let mut text = self.stdout.trim().to_string();
        if !self.stderr.trim().is_empty() {
            if !text.is_empty() {
                text.push('\n');
            }
            text.push_str(self.stderr.trim());
        }
        text
    }
}

/// Refspec mirroring every upstream branch under `origin/`
const ORIGIN_REFSPEC: &str = "+refs/heads/*:refs/remotes/origin/*";

/// Run git2 work against the clone at `path` on the blocking pool
async fn with_repo<T, F>(path: PathBuf, work: F) -> Result<T>
where
    F: FnOnce(&GitRepo) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || {
        let repo = GitRepo::open(&path)?;
        work(&repo)
    })
    .await
    .map_err(|e| Error::Other(format!("git task failed: {}", e)))?
}

/// Real git layer: one clone per repository under `cache_dir`
///
/// Clones record only the plain remote URL. The token is passed on the
/// command line of each fetch and push, so it never lands in `.git/config`
/// and a rotated token takes effect on the next call.
#[derive(Clone)]
pub struct LocalGit {
    cache_dir: PathBuf,
    remote_base: String,
    token: Option<String>,
    committer_name: String,
    committer_email: String,
}

impl std::fmt::Debug for LocalGit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalGit")
            .field("cache_dir", &self.cache_dir)
            .field("remote_base", &self.remote_base)
            .field("committer_name", &self.committer_name)
            .finish_non_exhaustive()
    }
}

impl LocalGit {
    pub fn new(cache_dir: impl Into<PathBuf>, token: Option<String>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            remote_base: "https://github.com".to_string(),
            token,
            committer_name: "ci-robot".to_string(),
            committer_email: "ci-robot@users.noreply.github.com".to_string(),
        }
    }

    /// Build from configuration, falling back to the default cache directory
    pub fn from_config(config: &Config, token: Option<String>) -> Result<Self> {
        let cache_dir = match config.git.cache_dir.clone() {
            Some(dir) => dir,
            None => super::remote::default_repos_cache_dir()?,
        };

        Ok(Self::new(cache_dir, token)
            .with_host(&config.git.remote_host)
            .with_committer(config.bot.login.clone(), config.bot.email.clone()))
    }

    /// Talk to `https://<host>`
    pub fn with_host(self, host: &str) -> Self {
        self.with_remote_base(format!("https://{}", host))
    }

    /// Talk to repositories under `base`, e.g. `https://git.example.com`
    pub fn with_remote_base(mut self, base: impl Into<String>) -> Self {
        self.remote_base = base.into();
        self
    }

    pub fn with_committer(mut self, name: impl Into<String>, email: impl Into<String>) -> Self {
        self.committer_name = name.into();
        self.committer_email = email.into();
        self
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    fn repo_path(&self, repo: &RepoKey) -> PathBuf {
        repo_cache_path(&self.cache_dir, repo)
    }

    async fn run(&self, dir: &Path, args: &[&str], stdin: Option<&[u8]>) -> Result<GitOutput> {
        let mut cmd = Command::new("git");
        cmd.arg("-c")
            .arg(format!("user.name={}", self.committer_name))
            .arg("-c")
            .arg(format!("user.email={}", self.committer_email))
            .args(args)
            .current_dir(dir)
            .stdin(if stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::Git("git executable not found".to_string())
            } else {
                Error::Io(e)
            }
        })?;

        if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
            pipe.write_all(input).await?;
            // Close stdin so git sees EOF
            drop(pipe);
        }

        let output = child.wait_with_output().await?;
        let token = self.token.as_deref();

        Ok(GitOutput {
            success: output.status.success(),
            stdout: redact(&String::from_utf8_lossy(&output.stdout), token),
            stderr: redact(&String::from_utf8_lossy(&output.stderr), token),
        })
    }

    /// Run git and turn a non-zero exit into an error naming `what`
    async fn run_checked(&self, dir: &Path, args: &[&str], what: &str) -> Result<GitOutput> {
        let output = self.run(dir, args, None).await?;
        if !output.success {
            return Err(Error::Git(format!("{} failed: {}", what, output.combined())));
        }
        Ok(output)
    }

    /// Create an empty clone whose `origin` is the plain remote URL
    async fn init_clone(&self, repo: &RepoKey, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::Config(format!("Invalid cache path {}", path.display())))?;
        tokio::fs::create_dir_all(parent).await?;

        let origin = remote_url(&self.remote_base, &repo.org, &repo.repo)?;
        let target = path.to_string_lossy().to_string();
        info!(repo = %repo, path = %target, "Creating clone");

        self.run_checked(parent, &["init", "--quiet", &target], "git init")
            .await?;
        self.run_checked(
            path,
            &["remote", "add", "origin", origin.as_str()],
            "git remote add",
        )
        .await?;
        Ok(())
    }
}

#[async_trait]
impl GitLayer for LocalGit {
    async fn prepare(&self, repo: &RepoKey, base: &str) -> Result<()> {
        let path = self.repo_path(repo);

        if !GitRepo::is_git_repo(&path) {
            self.init_clone(repo, &path).await?;
        }

        debug!(repo = %repo, path = %path.display(), "Fetching upstream branches");
        let url = authenticated_url(
            &self.remote_base,
            &repo.org,
            &repo.repo,
            self.token.as_deref(),
        )?;
        self.run_checked(
            &path,
            &["fetch", "--prune", url.as_str(), ORIGIN_REFSPEC],
            &format!("git fetch for {}", repo),
        )
        .await?;

        let base = base.to_string();
        with_repo(path, move |clone| {
            clone.remote_branch_commit(&base)?;
            Ok(())
        })
        .await
    }

    async fn checkout_new_branch(&self, repo: &RepoKey, base: &str, branch: &str) -> Result<()> {
        let (base, branch) = (base.to_string(), branch.to_string());
        with_repo(self.repo_path(repo), move |clone| {
            clone.checkout_branch_at(&branch, &base)
        })
        .await
    }

    async fn apply_patch(&self, repo: &RepoKey, patch: &[u8]) -> Result<ApplyOutcome> {
        let path = self.repo_path(repo);

        let output = self.run(&path, &["am", "--3way"], Some(patch)).await?;
        if output.success {
            debug!(repo = %repo, "Patch applied");
            return Ok(ApplyOutcome::Applied);
        }

        let reason = output.combined();
        let abort = self.run(&path, &["am", "--abort"], None).await?;
        if !abort.success {
            warn!(repo = %repo, output = %abort.combined(), "git am --abort failed");
        }

        Ok(ApplyOutcome::Conflict(reason))
    }

    async fn push(&self, repo: &RepoKey, target: &NewBranchSpec, force: bool) -> Result<()> {
        let path = self.repo_path(repo);
        let url = authenticated_url(
            &self.remote_base,
            &target.fork_owner,
            &target.fork_repo,
            self.token.as_deref(),
        )?;
        let refspec = format!("{0}:{0}", target.branch_name);

        let mut args = vec!["push"];
        if force {
            args.push("--force");
        }
        args.push(url.as_str());
        args.push(&refspec);

        let what = format!("git push to {}/{}", target.fork_owner, target.fork_repo);
        self.run_checked(&path, &args, &what).await?;

        info!(
            fork = %format!("{}/{}", target.fork_owner, target.fork_repo),
            branch = %target.branch_name,
            force,
            "Pushed cherry-pick branch"
        );
        Ok(())
    }
}
