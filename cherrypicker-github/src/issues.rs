//! Issue, comment and label operations

use crate::{Error, GitHubClient, Result};
use cherrypicker_core::types::{IssueComment, NewIssue};
use octocrab::models::issues::Comment as OctocrabComment;
use tracing::debug;

fn convert_comment(comment: OctocrabComment) -> IssueComment {
    IssueComment {
        author: comment.user.login,
        body: comment.body.unwrap_or_default(),
        created_at: Some(comment.created_at),
    }
}

impl GitHubClient {
    /// Post a comment on an issue or pull request
    pub async fn comment(&self, org: &str, repo: &str, number: u64, body: &str) -> Result<()> {
        debug!(org, repo, number, "Creating comment");

        self.client()
            .issues(org, repo)
            .create_comment(number, body)
            .await
            .map_err(Error::Api)?;
        Ok(())
    }

    /// Open an issue, returning its number
    pub async fn open_issue(&self, org: &str, repo: &str, issue: &NewIssue) -> Result<u64> {
        debug!(org, repo, title = %issue.title, "Creating issue");

        let created = self
            .client()
            .issues(org, repo)
            .create(&issue.title)
            .body(&issue.body)
            .labels(issue.labels.clone())
            .assignees(issue.assignees.clone())
            .send()
            .await
            .map_err(Error::Api)?;

        Ok(created.number)
    }

    /// All comments on an issue or pull request, oldest first
    pub async fn list_all_comments(
        &self,
        org: &str,
        repo: &str,
        number: u64,
    ) -> Result<Vec<IssueComment>> {
        let mut all_comments = Vec::new();
        let mut page_num = 1u32;
        loop {
            let page = self
                .client()
                .issues(org, repo)
                .list_comments(number)
                .per_page(100)
                .page(page_num)
                .send()
                .await
                .map_err(Error::Api)?;

            if page.items.is_empty() {
                break;
            }
            let has_next = page.next.is_some();
            all_comments.extend(page.items.into_iter().map(convert_comment));

            if !has_next {
                break;
            }
            page_num += 1;
        }

        debug!(org, repo, number, count = all_comments.len(), "Fetched comments");
        Ok(all_comments)
    }

    /// Names of the labels on an issue or pull request
    pub async fn labels_on(&self, org: &str, repo: &str, number: u64) -> Result<Vec<String>> {
        let page = self
            .client()
            .issues(org, repo)
            .list_labels_for_issue(number)
            .per_page(100)
            .send()
            .await
            .map_err(Error::Api)?;

        Ok(page.items.into_iter().map(|l| l.name).collect())
    }

    pub async fn label(&self, org: &str, repo: &str, number: u64, label: &str) -> Result<()> {
        self.client()
            .issues(org, repo)
            .add_labels(number, &[label.to_string()])
            .await
            .map_err(Error::Api)?;
        Ok(())
    }

    pub async fn assign(
        &self,
        org: &str,
        repo: &str,
        number: u64,
        logins: &[String],
    ) -> Result<()> {
        let logins: Vec<&str> = logins.iter().map(String::as_str).collect();
        self.client()
            .issues(org, repo)
            .add_assignees(number, &logins)
            .await
            .map_err(Error::Api)?;
        Ok(())
    }
}
