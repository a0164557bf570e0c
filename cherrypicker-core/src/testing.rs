//! In-memory test doubles for the platform and the git layer

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::git::{ApplyOutcome, GitLayer};
use crate::platform::Platform;
use crate::types::{
    IssueComment, NewBranchSpec, NewIssue, NewPullRequestSpec, PrState, PullRequest, RepoKey,
};
use crate::{Error, Result};

/// A merged source PR in the shape most tests start from
pub fn merged_pr(number: u64) -> PullRequest {
    PullRequest {
        number,
        title: "This is a fix for X".to_string(),
        body: "This PR updates the magic number.".to_string(),
        state: PrState::Closed,
        merged: true,
        merge_commit_sha: Some("abcdefg".to_string()),
        head_ref: "developer:fix-x".to_string(),
        base_ref: "master".to_string(),
        labels: Vec::new(),
        requested_reviewers: vec!["user1".to_string()],
        assignees: vec!["user2".to_string()],
        author: "developer".to_string(),
        html_url: None,
    }
}

#[derive(Default)]
struct PlatformState {
    /// Seeded pull requests, keyed by number
    pulls: HashMap<u64, PullRequest>,
    /// Pull requests opened through the trait
    created: Vec<(u64, NewPullRequestSpec)>,
    /// Labels, reviewers and assignees applied to created PRs
    created_state: HashMap<u64, PullRequest>,
    issues: Vec<NewIssue>,
    comments: Vec<(u64, String)>,
    history: Vec<IssueComment>,
    added_labels: Vec<(u64, String)>,
    members: HashSet<String>,
    non_member: bool,
    fail_issue_creation: bool,
    fork_calls: usize,
    next_number: u64,
}

/// In-memory [`Platform`]
///
/// `ensure_fork` renames `changeme` to `changed` and fails for `error`.
#[derive(Default)]
pub struct FakePlatform {
    state: Mutex<PlatformState>,
    patch: Mutex<Vec<u8>>,
    fork_busy: AtomicBool,
}

impl FakePlatform {
    fn state(&self) -> MutexGuard<'_, PlatformState> {
        self.state.lock().unwrap()
    }

    pub fn with_pull_request(self, pr: PullRequest) -> Self {
        self.state().pulls.insert(pr.number, pr);
        self
    }

    pub fn with_comment(self, comment: IssueComment) -> Self {
        self.state().history.push(comment);
        self
    }

    pub fn with_members(self, members: &[&str]) -> Self {
        self.state()
            .members
            .extend(members.iter().map(|m| m.to_string()));
        self
    }

    /// Default answer for users not listed as members
    pub fn set_member(&self, member: bool) {
        self.state().non_member = !member;
    }

    pub fn fail_issue_creation(&self) {
        self.state().fail_issue_creation = true;
    }

    pub fn issues(&self) -> Vec<NewIssue> {
        self.state().issues.clone()
    }

    pub fn comments(&self) -> Vec<(u64, String)> {
        self.state().comments.clone()
    }

    pub fn created_prs(&self) -> Vec<NewPullRequestSpec> {
        self.state()
            .created
            .iter()
            .map(|(_, s)| s.clone())
            .collect()
    }

    pub fn added_labels(&self) -> Vec<(u64, String)> {
        self.state().added_labels.clone()
    }

    /// A created PR with the labels, reviewers and assignees applied so far
    pub fn pull_request_state(&self, number: u64) -> Option<PullRequest> {
        self.state().created_state.get(&number).cloned()
    }

    pub fn fork_calls(&self) -> usize {
        self.state().fork_calls
    }

    fn next_number(state: &mut PlatformState) -> u64 {
        state.next_number += 1;
        state.next_number
    }
}

#[async_trait]
impl Platform for FakePlatform {
    async fn get_pull_request(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest> {
        self.state()
            .pulls
            .get(&number)
            .cloned()
            .ok_or_else(|| Error::Platform(format!("{}/{}#{} not found", org, repo, number)))
    }

    async fn get_pull_request_patch(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<u8>> {
        Ok(self.patch.lock().unwrap().clone())
    }

    async fn get_pull_requests(&self, _org: &str, _repo: &str) -> Result<Vec<PullRequest>> {
        let state = self.state();
        let mut prs: Vec<PullRequest> = state.pulls.values().cloned().collect();
        prs.extend(state.created.iter().map(|(number, spec)| PullRequest {
            number: *number,
            title: spec.title.clone(),
            body: spec.body.clone(),
            base_ref: spec.base.clone(),
            head_ref: spec.head.clone(),
            ..Default::default()
        }));
        Ok(prs)
    }

    async fn create_comment(&self, _org: &str, _repo: &str, number: u64, body: &str) -> Result<()> {
        self.state().comments.push((number, body.to_string()));
        Ok(())
    }

    async fn create_issue(&self, _org: &str, _repo: &str, issue: &NewIssue) -> Result<u64> {
        let mut state = self.state();
        if state.fail_issue_creation {
            return Err(Error::Platform("issue creation failed".to_string()));
        }
        state.issues.push(issue.clone());
        Ok(Self::next_number(&mut state))
    }

    async fn create_pull_request(
        &self,
        _org: &str,
        _repo: &str,
        spec: &NewPullRequestSpec,
    ) -> Result<u64> {
        let mut state = self.state();
        let number = Self::next_number(&mut state);
        state.created.push((number, spec.clone()));
        state.created_state.insert(
            number,
            PullRequest {
                number,
                title: spec.title.clone(),
                ..Default::default()
            },
        );
        Ok(number)
    }

    async fn add_label(&self, _org: &str, _repo: &str, number: u64, label: &str) -> Result<()> {
        let mut state = self.state();
        state.added_labels.push((number, label.to_string()));
        if let Some(pr) = state.created_state.get_mut(&number) {
            pr.labels.push(label.to_string());
        } else if let Some(pr) = state.pulls.get_mut(&number) {
            pr.labels.push(label.to_string());
        }
        Ok(())
    }

    async fn assign_issue(
        &self,
        _org: &str,
        _repo: &str,
        number: u64,
        logins: &[String],
    ) -> Result<()> {
        if let Some(pr) = self.state().created_state.get_mut(&number) {
            pr.assignees.extend(logins.iter().cloned());
        }
        Ok(())
    }

    async fn request_review(
        &self,
        _org: &str,
        _repo: &str,
        number: u64,
        logins: &[String],
    ) -> Result<()> {
        if let Some(pr) = self.state().created_state.get_mut(&number) {
            pr.requested_reviewers.extend(logins.iter().cloned());
        }
        Ok(())
    }

    async fn is_member(&self, _org: &str, user: &str) -> Result<bool> {
        let state = self.state();
        Ok(state.members.contains(user) || !state.non_member)
    }

    async fn list_org_members(&self, _org: &str) -> Result<Vec<String>> {
        Ok(self.state().members.iter().cloned().collect())
    }

    async fn ensure_fork(&self, _owner: &str, _org: &str, repo: &str) -> Result<String> {
        if self.fork_busy.swap(true, Ordering::SeqCst) {
            return Err(Error::Platform("concurrent fork request".to_string()));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.fork_busy.store(false, Ordering::SeqCst);

        self.state().fork_calls += 1;
        match repo {
            "changeme" => Ok("changed".to_string()),
            "error" => Err(Error::Platform("fork failed".to_string())),
            other => Ok(other.to_string()),
        }
    }

    async fn list_issue_comments(
        &self,
        _org: &str,
        _repo: &str,
        _number: u64,
    ) -> Result<Vec<IssueComment>> {
        Ok(self.state().history.clone())
    }

    async fn get_issue_labels(&self, _org: &str, _repo: &str, number: u64) -> Result<Vec<String>> {
        Ok(self
            .state()
            .pulls
            .get(&number)
            .map(|pr| pr.labels.clone())
            .unwrap_or_default())
    }
}

/// Recording [`GitLayer`]
///
/// Every operation sleeps briefly and fails if another operation is already
/// running, so unserialized callers are caught.
#[derive(Default)]
pub struct FakeGit {
    ops: Mutex<Vec<String>>,
    pushes: Mutex<Vec<(NewBranchSpec, bool)>>,
    conflict: Option<String>,
    missing: HashSet<String>,
    failing_pushes: HashSet<String>,
    busy: AtomicBool,
}

impl FakeGit {
    pub fn with_conflict(mut self, reason: &str) -> Self {
        self.conflict = Some(reason.to_string());
        self
    }

    pub fn with_missing_branch(mut self, branch: &str) -> Self {
        self.missing.insert(branch.to_string());
        self
    }

    /// Pushes of the cherry-pick onto `branch` fail
    pub fn with_push_failure(mut self, branch: &str) -> Self {
        self.failing_pushes.insert(branch.to_string());
        self
    }

    pub fn operations(&self) -> Vec<String> {
        self.ops.lock().unwrap().clone()
    }

    pub fn pushes(&self) -> Vec<(NewBranchSpec, bool)> {
        self.pushes.lock().unwrap().clone()
    }

    async fn enter(&self, op: String) -> Result<()> {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(Error::Git(format!("concurrent access during {}", op)));
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
        self.ops.lock().unwrap().push(op);
        self.busy.store(false, Ordering::SeqCst);
        Ok(())
    }
}

#[async_trait]
impl GitLayer for FakeGit {
    async fn prepare(&self, repo: &RepoKey, base: &str) -> Result<()> {
        self.enter(format!("prepare {} {}", repo, base)).await?;
        if self.missing.contains(base) {
            return Err(Error::BranchNotFound(base.to_string()));
        }
        Ok(())
    }

    async fn checkout_new_branch(&self, repo: &RepoKey, base: &str, branch: &str) -> Result<()> {
        self.enter(format!("checkout {} {} {}", repo, base, branch))
            .await
    }

    async fn apply_patch(&self, repo: &RepoKey, _patch: &[u8]) -> Result<ApplyOutcome> {
        self.enter(format!("apply {}", repo)).await?;
        Ok(match &self.conflict {
            Some(reason) => ApplyOutcome::Conflict(reason.clone()),
            None => ApplyOutcome::Applied,
        })
    }

    async fn push(&self, repo: &RepoKey, target: &NewBranchSpec, force: bool) -> Result<()> {
        self.enter(format!("push {} {}", repo, target.branch_name))
            .await?;
        if self
            .failing_pushes
            .iter()
            .any(|b| target.branch_name.ends_with(&format!("-to-{}", b)))
        {
            return Err(Error::Git(format!("push of {} rejected", target.branch_name)));
        }
        self.pushes.lock().unwrap().push((target.clone(), force));
        Ok(())
    }
}
