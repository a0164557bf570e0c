//! Git layer for cherrypicker
//!
//! The orchestrator drives git through the [`GitLayer`] trait: refresh the
//! shared clone, create the cherry-pick branch, apply the patch and push.
//! [`LocalGit`] is the real implementation backed by a cache of clones.

mod local;
mod remote;
mod repo;

use async_trait::async_trait;

use crate::types::{NewBranchSpec, RepoKey};
use crate::Result;

pub use local::LocalGit;
pub use remote::{authenticated_url, default_repos_cache_dir, remote_url, repo_cache_path};
pub use repo::GitRepo;

/// Result of applying a patch onto the cherry-pick branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// The patch applied and was committed
    Applied,
    /// The patch did not apply; the working copy was restored
    Conflict(String),
}

/// Operations on the shared local working copy of a repository
///
/// Callers must hold the repository's lock for the whole sequence.
#[async_trait]
pub trait GitLayer: Send + Sync {
    /// Clone or refresh the repository and make sure `base` exists upstream
    ///
    /// Fails with [`crate::Error::BranchNotFound`] when it does not.
    async fn prepare(&self, repo: &RepoKey, base: &str) -> Result<()>;

    /// Check out `branch` at the tip of upstream `base`
    ///
    /// An existing local branch of the same name is reset and reused.
    async fn checkout_new_branch(&self, repo: &RepoKey, base: &str, branch: &str) -> Result<()>;

    /// Apply an mbox-style patch on the checked out branch
    async fn apply_patch(&self, repo: &RepoKey, patch: &[u8]) -> Result<ApplyOutcome>;

    /// Push the branch to the bot's fork
    async fn push(&self, repo: &RepoKey, target: &NewBranchSpec, force: bool) -> Result<()>;
}
