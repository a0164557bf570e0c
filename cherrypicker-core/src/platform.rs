//! Code-hosting platform abstraction
//!
//! The orchestrator never talks to an API directly; it goes through this
//! trait so the GitHub client and the in-memory test double are
//! interchangeable. Every call is treated as terminal for the current branch
//! when it fails.

use async_trait::async_trait;

use crate::types::{IssueComment, NewIssue, NewPullRequestSpec, PullRequest};
use crate::Result;

/// Operations the cherry-pick pipeline consumes from the platform
#[async_trait]
pub trait Platform: Send + Sync {
    /// Fetch a single pull request
    async fn get_pull_request(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest>;

    /// Fetch the pull request as an mbox-style patch
    async fn get_pull_request_patch(&self, org: &str, repo: &str, number: u64) -> Result<Vec<u8>>;

    /// List every pull request in the repository, open and closed
    async fn get_pull_requests(&self, org: &str, repo: &str) -> Result<Vec<PullRequest>>;

    /// Comment on an issue or pull request
    async fn create_comment(&self, org: &str, repo: &str, number: u64, body: &str) -> Result<()>;

    /// Open an issue, returning its number
    async fn create_issue(&self, org: &str, repo: &str, issue: &NewIssue) -> Result<u64>;

    /// Open a pull request, returning its number
    ///
    /// Only title, body, head and base are sent here; labels, reviewers and
    /// assignees are applied afterwards with the dedicated calls.
    async fn create_pull_request(
        &self,
        org: &str,
        repo: &str,
        spec: &NewPullRequestSpec,
    ) -> Result<u64>;

    async fn add_label(&self, org: &str, repo: &str, number: u64, label: &str) -> Result<()>;

    async fn assign_issue(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        logins: &[String],
    ) -> Result<()>;

    async fn request_review(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        logins: &[String],
    ) -> Result<()>;

    /// Whether `user` is a member of `org`
    async fn is_member(&self, org: &str, user: &str) -> Result<bool>;

    /// Logins of every member of `org`
    async fn list_org_members(&self, org: &str) -> Result<Vec<String>>;

    /// Make sure `owner` has a fork of `org/repo`, returning the fork's name
    async fn ensure_fork(&self, owner: &str, org: &str, repo: &str) -> Result<String>;

    async fn list_issue_comments(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>>;

    /// Label names currently on an issue or pull request
    async fn get_issue_labels(&self, org: &str, repo: &str, number: u64) -> Result<Vec<String>>;
}
