//! The cherry-pick orchestrator
//!
//! [`CherryPicker`] owns the collaborators (platform, git layer, lock
//! manager, configuration) and runs one [`CherryPickRequest`] at a time per
//! repository:
//! 1. Ensure the bot's fork exists
//! 2. Refresh the shared clone at the target branch
//! 3. Create the deterministic cherry-pick branch
//! 4. Fetch the source patch and apply it
//! 5. Force-push to the fork and open the pull request
//!
//! A patch that does not apply is handed to the conflict handler instead.

use std::sync::Arc;

use tracing::{info, instrument, warn};

use crate::config::{Config, ConfigStore, RepoConfig};
use crate::conflict::{report_conflict, ConflictRecord};
use crate::dedup::{PickLedger, TitleLedger};
use crate::git::{ApplyOutcome, GitLayer};
use crate::lock::RepoLockManager;
use crate::metadata::build_pull_request;
use crate::platform::Platform;
use crate::types::{CherryPickRequest, NewBranchSpec, NewPullRequestSpec, PullRequest};
use crate::{Error, Result};

/// How a single branch's cherry-pick ended, short of an error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PickOutcome {
    /// The patch applied and a pull request was opened
    Created { number: u64 },
    /// The patch did not apply; the requester was told
    Conflict(ConflictRecord),
    /// Nothing was attempted; the requester was told why
    Rejected { reason: String },
    /// Another task opened this cherry-pick while we waited for the lock
    AlreadyPicked,
}

/// Shared state behind the cheap-to-clone [`CherryPicker`] handle
struct Inner {
    platform: Arc<dyn Platform>,
    git: Arc<dyn GitLayer>,
    locks: RepoLockManager,
    config: Arc<ConfigStore>,
}

/// Cherry-pick orchestrator
///
/// Clones share the same lock registry, so every clone serializes git work
/// on the same repositories.
#[derive(Clone)]
pub struct CherryPicker {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for CherryPicker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CherryPicker")
            .field("repos_seen", &self.inner.locks.len())
            .finish_non_exhaustive()
    }
}

impl CherryPicker {
    pub fn new(
        platform: Arc<dyn Platform>,
        git: Arc<dyn GitLayer>,
        config: Arc<ConfigStore>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                platform,
                git,
                locks: RepoLockManager::new(),
                config,
            }),
        }
    }

    pub fn platform(&self) -> &dyn Platform {
        self.inner.platform.as_ref()
    }

    pub(crate) fn platform_arc(&self) -> Arc<dyn Platform> {
        Arc::clone(&self.inner.platform)
    }

    /// Current configuration snapshot
    pub fn config(&self) -> Arc<Config> {
        self.inner.config.get()
    }

    pub fn locks(&self) -> &RepoLockManager {
        &self.inner.locks
    }

    /// Make sure the bot has a fork of the repository
    ///
    /// Returns the fork's name, which differs from the source repository when
    /// the platform had to rename it.
    pub async fn ensure_fork(&self, bot_login: &str, org: &str, repo: &str) -> Result<String> {
        let fork = self.inner.platform.ensure_fork(bot_login, org, repo).await?;
        if fork != repo {
            info!(org, repo, fork = %fork, "Fork exists under a different name");
        }
        Ok(fork)
    }

    /// Cherry-pick `source` onto `request.target_branch`
    ///
    /// Holds the repository lock from the title check until the pull request
    /// is open or the conflict has been reported, so two requests for the
    /// same branch never both open a pull request.
    #[instrument(
        skip(self, source, repo_config),
        fields(repo = %request.repo, pr = request.source, branch = %request.target_branch)
    )]
    pub async fn cherry_pick(
        &self,
        request: &CherryPickRequest,
        source: &PullRequest,
        repo_config: &RepoConfig,
    ) -> Result<PickOutcome> {
        let config = self.config();
        let bot_login = config.bot.login.as_str();
        let platform = self.platform();
        let org = request.repo.org.as_str();
        let repo = request.repo.repo.as_str();

        let _guard = self.inner.locks.acquire(&request.repo).await;

        // The caller's title check ran before the lock; a concurrent event
        // may have opened the same cherry-pick since.
        let existing = platform.get_pull_requests(org, repo).await?;
        if TitleLedger::from_pull_requests(&existing)
            .already_picked(source.number, &request.target_branch)
        {
            info!("Cherry-pick opened while waiting for the lock, skipping");
            return Ok(PickOutcome::AlreadyPicked);
        }

        let fork = self.ensure_fork(bot_login, org, repo).await?;
        let branch = NewBranchSpec::new(bot_login, fork, source.number, &request.target_branch);

        match self
            .inner
            .git
            .prepare(&request.repo, &request.target_branch)
            .await
        {
            Ok(()) => {}
            Err(Error::BranchNotFound(missing)) => {
                let reason = format!("cannot checkout `{}`: branch does not exist", missing);
                warn!(reason = %reason, "Abandoning cherry-pick");
                platform
                    .create_comment(org, repo, source.number, &request.reply(&reason))
                    .await?;
                return Ok(PickOutcome::Rejected { reason });
            }
            Err(e) => return Err(e),
        }

        self.inner
            .git
            .checkout_new_branch(&request.repo, &request.target_branch, &branch.branch_name)
            .await?;

        let patch = platform
            .get_pull_request_patch(org, repo, source.number)
            .await?;

        match self.inner.git.apply_patch(&request.repo, &patch).await? {
            ApplyOutcome::Applied => {}
            ApplyOutcome::Conflict(reason) => {
                let record = report_conflict(
                    platform,
                    source,
                    request,
                    &reason,
                    repo_config.create_issue_on_conflict,
                    bot_login,
                )
                .await?;
                return Ok(PickOutcome::Conflict(record));
            }
        }

        // Always forced: the branch name is deterministic and a retry must
        // overwrite whatever an earlier attempt left in the fork.
        self.inner.git.push(&request.repo, &branch, true).await?;

        let spec = build_pull_request(source, request, &branch, repo_config, bot_login);
        let number = self.submit(request, &spec).await?;

        let message = format!("new pull request created: #{}", number);
        platform
            .create_comment(org, repo, source.number, &request.reply(&message))
            .await?;

        Ok(PickOutcome::Created { number })
    }

    /// Open the pull request and apply its labels, reviewers and assignees
    pub async fn submit(
        &self,
        request: &CherryPickRequest,
        spec: &NewPullRequestSpec,
    ) -> Result<u64> {
        let platform = self.platform();
        let org = request.repo.org.as_str();
        let repo = request.repo.repo.as_str();

        let number = platform.create_pull_request(org, repo, spec).await?;
        info!(
            repo = %request.repo,
            number,
            title = %spec.title,
            "Created cherry-pick pull request"
        );

        for label in &spec.labels {
            platform.add_label(org, repo, number, label).await?;
        }
        if !spec.reviewers.is_empty() {
            platform
                .request_review(org, repo, number, &spec.reviewers)
                .await?;
        }
        if !spec.assignees.is_empty() {
            platform
                .assign_issue(org, repo, number, &spec.assignees)
                .await?;
        }

        Ok(number)
    }
}
