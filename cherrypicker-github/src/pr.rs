//! Pull request operations

use crate::error::pr_not_found;
use crate::{Error, GitHubClient, Result};
use cherrypicker_core::types::{NewPullRequestSpec, PrState, PullRequest};
use octocrab::models::pulls::PullRequest as OctocrabPR;
use tracing::{debug, info};

/// Media type GitHub serves mbox-style patches under
const PATCH_MEDIA_TYPE: &str = "application/vnd.github.v3.patch";

fn pr_state(state: Option<octocrab::models::IssueState>) -> PrState {
    match state {
        Some(octocrab::models::IssueState::Closed) => PrState::Closed,
        _ => PrState::Open,
    }
}

/// Convert an octocrab pull request into the platform-neutral snapshot
pub fn convert_pull_request(pr: OctocrabPR) -> PullRequest {
    let merged = pr.merged_at.is_some();

    PullRequest {
        number: pr.number,
        title: pr.title.unwrap_or_default(),
        body: pr.body.unwrap_or_default(),
        state: pr_state(pr.state),
        merged,
        merge_commit_sha: pr.merge_commit_sha,
        head_ref: pr.head.label.unwrap_or(pr.head.ref_field),
        base_ref: pr.base.ref_field,
        labels: pr
            .labels
            .unwrap_or_default()
            .into_iter()
            .map(|l| l.name)
            .collect(),
        requested_reviewers: pr
            .requested_reviewers
            .unwrap_or_default()
            .into_iter()
            .map(|u| u.login)
            .collect(),
        assignees: pr
            .assignees
            .unwrap_or_default()
            .into_iter()
            .map(|u| u.login)
            .collect(),
        author: pr.user.map(|u| u.login).unwrap_or_default(),
        html_url: pr.html_url.map(|u| u.to_string()),
    }
}

impl GitHubClient {
    /// Get a pull request by number
    pub async fn get_pr(&self, org: &str, repo: &str, number: u64) -> Result<PullRequest> {
        debug!(org, repo, number, "Fetching pull request");

        let pr = self
            .client()
            .pulls(org, repo)
            .get(number)
            .await
            .map_err(|e| pr_not_found(e, format!("{}/{}#{}", org, repo, number)))?;

        Ok(convert_pull_request(pr))
    }

    /// List every pull request, open and closed, paginating through all pages
    pub async fn list_all_prs(&self, org: &str, repo: &str) -> Result<Vec<PullRequest>> {
        debug!(org, repo, "Listing all pull requests");

        let mut all_prs = Vec::new();
        let mut page_num = 1u32;
        loop {
            let page = self
                .client()
                .pulls(org, repo)
                .list()
                .state(octocrab::params::State::All)
                .per_page(100)
                .page(page_num)
                .send()
                .await
                .map_err(Error::Api)?;

            if page.items.is_empty() {
                break;
            }
            let has_next = page.next.is_some();
            all_prs.extend(page.items.into_iter().map(convert_pull_request));

            if !has_next {
                break;
            }
            page_num += 1;
        }

        info!(org, repo, count = all_prs.len(), "Fetched pull requests");
        Ok(all_prs)
    }

    /// Download the pull request as a patch
    pub async fn get_patch(&self, org: &str, repo: &str, number: u64) -> Result<Vec<u8>> {
        let url = format!("{}/repos/{}/{}/pulls/{}", self.api_base(), org, repo, number);
        debug!(url = %url, "Fetching pull request patch");

        let response = self
            .http()
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.token()))
            .header("Accept", PATCH_MEDIA_TYPE)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read response".to_string());
            return Err(Error::Other(format!(
                "Fetching patch for {}/{}#{} failed with status {}: {}",
                org, repo, number, status, text
            )));
        }

        Ok(response.bytes().await?.to_vec())
    }

    /// Open a pull request from the requested head branch onto its base
    ///
    /// Maintainers may push to the head branch.
    pub async fn open_pr(&self, org: &str, repo: &str, spec: &NewPullRequestSpec) -> Result<u64> {
        let pr = self
            .client()
            .pulls(org, repo)
            .create(&spec.title, &spec.head, &spec.base)
            .body(&spec.body)
            .maintainer_can_modify(true)
            .send()
            .await
            .map_err(Error::Api)?;

        info!(org, repo, number = pr.number, head = %spec.head, "Opened pull request");
        Ok(pr.number)
    }

    /// Request reviews from users
    pub async fn request_reviewers(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        reviewers: &[String],
    ) -> Result<()> {
        self.client()
            .pulls(org, repo)
            .request_reviews(number, reviewers.to_vec(), Vec::<String>::new())
            .await
            .map_err(Error::Api)?;
        Ok(())
    }
}
