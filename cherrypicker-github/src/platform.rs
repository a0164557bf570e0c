//! `Platform` implementation for the cherry-pick pipeline

use async_trait::async_trait;
use cherrypicker_core::types::{IssueComment, NewIssue, NewPullRequestSpec, PullRequest};
use cherrypicker_core::Platform;

use crate::GitHubClient;

type CoreResult<T> = cherrypicker_core::Result<T>;

#[async_trait]
impl Platform for GitHubClient {
    async fn get_pull_request(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> CoreResult<PullRequest> {
        Ok(self.get_pr(org, repo, number).await?)
    }

    async fn get_pull_request_patch(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> CoreResult<Vec<u8>> {
        Ok(self.get_patch(org, repo, number).await?)
    }

    async fn get_pull_requests(&self, org: &str, repo: &str) -> CoreResult<Vec<PullRequest>> {
        Ok(self.list_all_prs(org, repo).await?)
    }

    async fn create_comment(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        body: &str,
    ) -> CoreResult<()> {
        Ok(self.comment(org, repo, number, body).await?)
    }

    async fn create_issue(&self, org: &str, repo: &str, issue: &NewIssue) -> CoreResult<u64> {
        Ok(self.open_issue(org, repo, issue).await?)
    }

    async fn create_pull_request(
        &self,
        org: &str,
        repo: &str,
        spec: &NewPullRequestSpec,
    ) -> CoreResult<u64> {
        Ok(self.open_pr(org, repo, spec).await?)
    }

    async fn add_label(&self, org: &str, repo: &str, number: u64, label: &str) -> CoreResult<()> {
        Ok(self.label(org, repo, number, label).await?)
    }

    async fn assign_issue(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        logins: &[String],
    ) -> CoreResult<()> {
        Ok(self.assign(org, repo, number, logins).await?)
    }

    async fn request_review(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        logins: &[String],
    ) -> CoreResult<()> {
        Ok(self.request_reviewers(org, repo, number, logins).await?)
    }

    async fn is_member(&self, org: &str, user: &str) -> CoreResult<bool> {
        Ok(self.check_member(org, user).await?)
    }

    async fn list_org_members(&self, org: &str) -> CoreResult<Vec<String>> {
        Ok(self.list_members(org).await?)
    }

    async fn ensure_fork(&self, owner: &str, org: &str, repo: &str) -> CoreResult<String> {
        Ok(self.fork(owner, org, repo).await?)
    }

    async fn list_issue_comments(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> CoreResult<Vec<IssueComment>> {
        Ok(self.list_all_comments(org, repo, number).await?)
    }

    async fn get_issue_labels(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> CoreResult<Vec<String>> {
        Ok(self.labels_on(org, repo, number).await?)
    }
}
