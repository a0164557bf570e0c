//! git2-backed access to a cached clone

use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{Commit, Repository};

use crate::{Error, Result};

/// A cached clone opened with git2
pub struct GitRepo {
    repo: Repository,
    root: PathBuf,
}

impl std::fmt::Debug for GitRepo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitRepo")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

impl GitRepo {
    /// Open the repository whose working directory is `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        let repo = Repository::open(path).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                Error::Git(format!("Not a git repository: {}", path.display()))
            } else {
                Error::Git(format!("Failed to open {}: {}", path.display(), e))
            }
        })?;

        let root = repo
            .workdir()
            .ok_or_else(|| Error::Git("Bare repositories are not supported".to_string()))?
            .to_path_buf();

        Ok(Self { repo, root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check if the given path holds a git repository
    pub fn is_git_repo(path: impl AsRef<Path>) -> bool {
        Repository::open(path.as_ref()).is_ok()
    }

    /// Tip commit of `origin/<branch>`
    pub fn remote_branch_commit(&self, branch: &str) -> Result<Commit<'_>> {
        let reference = self
            .repo
            .find_reference(&format!("refs/remotes/origin/{}", branch))
            .map_err(|_| Error::BranchNotFound(branch.to_string()))?;

        reference
            .peel_to_commit()
            .map_err(|e| Error::Git(format!("Failed to resolve origin/{}: {}", branch, e)))
    }

    /// Whether a local branch exists
    pub fn has_local_branch(&self, branch: &str) -> bool {
        self.repo
            .find_branch(branch, git2::BranchType::Local)
            .is_ok()
    }

    /// Point `branch` at `origin/<base>` and check it out
    ///
    /// The branch is created if missing and force-reset if it already exists,
    /// so repeating the call is harmless. Local modifications and untracked
    /// files are discarded.
    pub fn checkout_branch_at(&self, branch: &str, base: &str) -> Result<()> {
        let commit = self.remote_branch_commit(base)?;

        let mut checkout = CheckoutBuilder::new();
        checkout.force().remove_untracked(true);
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))?;

        // Detach first: git refuses to force-move the branch HEAD points at.
        self.repo.set_head_detached(commit.id())?;

        let reused = self.has_local_branch(branch);
        self.repo.branch(branch, &commit, true)?;
        self.repo.set_head(&format!("refs/heads/{}", branch))?;

        tracing::debug!(
            branch,
            base,
            commit = %commit.id(),
            reused,
            "Checked out cherry-pick branch"
        );
        Ok(())
    }

    /// Name of the checked out branch, `None` when detached or unborn
    pub fn current_branch(&self) -> Result<Option<String>> {
        let head = match self.repo.head() {
            Ok(h) => h,
            Err(e) if e.code() == git2::ErrorCode::UnbornBranch => return Ok(None),
            Err(e) => return Err(Error::Git(format!("Failed to get HEAD: {}", e))),
        };

        if head.is_branch() {
            Ok(head.shorthand().map(|s| s.to_string()))
        } else {
            Ok(None)
        }
    }

    pub fn inner(&self) -> &Repository {
        &self.repo
    }
}
