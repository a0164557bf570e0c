//! Domain types shared by the orchestrator and platform clients

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Identifies one shared local working copy: an (org, repo) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RepoKey {
    /// Organization or user owning the repository
    pub org: String,
    /// Repository name
    pub repo: String,
}

impl RepoKey {
    pub fn new(org: impl Into<String>, repo: impl Into<String>) -> Self {
        Self {
            org: org.into(),
            repo: repo.into(),
        }
    }

    /// Parse `org/repo` shorthand
    pub fn parse(input: &str) -> Result<Self> {
        match input.trim().split_once('/') {
            Some((org, repo)) if !org.is_empty() && !repo.is_empty() && !repo.contains('/') => {
                Ok(Self::new(org, repo.trim_end_matches(".git")))
            }
            _ => Err(Error::Config(format!(
                "Invalid repository format: {}. Expected org/repo",
                input
            ))),
        }
    }
}

impl fmt::Display for RepoKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.org, self.repo)
    }
}

/// Pull request state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrState {
    #[default]
    Open,
    Closed,
}

/// Snapshot of a pull request as reported by the platform
///
/// The source PR of a cherry-pick is read once and never mutated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub state: PrState,
    #[serde(default)]
    pub merged: bool,
    pub merge_commit_sha: Option<String>,
    /// Head ref, `owner:branch` for PRs opened from a fork
    pub head_ref: String,
    pub base_ref: String,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub requested_reviewers: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    /// Login of the PR author
    pub author: String,
    pub html_url: Option<String>,
}

/// A comment on an issue or pull request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssueComment {
    pub author: String,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl IssueComment {
    pub fn new(author: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            author: author.into(),
            body: body.into(),
            created_at: None,
        }
    }
}

/// An issue to open on the platform
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewIssue {
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub assignees: Vec<String>,
}

/// Everything needed to open the cherry-pick pull request
///
/// Built fresh per request and never mutated after submission.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewPullRequestSpec {
    pub title: String,
    pub body: String,
    /// `<forkOwner>:<branchName>`
    pub head: String,
    pub base: String,
    pub labels: Vec<String>,
    pub reviewers: Vec<String>,
    pub assignees: Vec<String>,
}

/// The bot-owned fork and branch a cherry-pick is pushed to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBranchSpec {
    pub fork_owner: String,
    /// Fork repository name; may differ from the source repo if renamed
    pub fork_repo: String,
    pub branch_name: String,
}

impl NewBranchSpec {
    pub fn new(
        fork_owner: impl Into<String>,
        fork_repo: impl Into<String>,
        source: u64,
        target_branch: &str,
    ) -> Self {
        Self {
            fork_owner: fork_owner.into(),
            fork_repo: fork_repo.into(),
            branch_name: cherry_pick_branch_name(source, target_branch),
        }
    }

    /// Head reference for the new pull request
    pub fn head(&self) -> String {
        format!("{}:{}", self.fork_owner, self.branch_name)
    }
}

/// Deterministic local/fork branch name for a (source PR, target branch) pair
pub fn cherry_pick_branch_name(source: u64, target_branch: &str) -> String {
    format!("cherry-pick-{}-to-{}", source, target_branch)
}

/// What caused a cherry-pick to be requested
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trigger {
    Comment,
    Label,
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Comment => write!(f, "comment"),
            Trigger::Label => write!(f, "label"),
        }
    }
}

/// One resolved unit of work: cherry-pick one source PR onto one branch
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CherryPickRequest {
    pub source: u64,
    pub repo: RepoKey,
    pub target_branch: String,
    /// Login of whoever asked for it
    pub actor: String,
    pub trigger: Trigger,
}

impl CherryPickRequest {
    /// Prefix a reply to the requester according to how they asked
    pub fn reply(&self, message: &str) -> String {
        match self.trigger {
            Trigger::Comment => format!("@{}: {}", self.actor, message),
            Trigger::Label => format!("In response to a cherrypick label: {}", message),
        }
    }
}
