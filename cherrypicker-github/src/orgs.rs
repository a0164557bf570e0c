//! Organization membership and forks

use crate::{Error, GitHubClient, Result};
use tracing::{debug, info, warn};

impl GitHubClient {
    /// Whether `user` belongs to `org`
    pub async fn check_member(&self, org: &str, user: &str) -> Result<bool> {
        let member = self
            .client()
            .orgs(org)
            .check_membership(user)
            .await
            .map_err(Error::Api)?;

        debug!(org, user, member, "Checked org membership");
        Ok(member)
    }

    /// Logins of every member of `org`
    pub async fn list_members(&self, org: &str) -> Result<Vec<String>> {
        let mut members = Vec::new();
        let mut page_num = 1u32;
        loop {
            let page = self
                .client()
                .orgs(org)
                .list_members()
                .per_page(100)
                .page(page_num)
                .send()
                .await
                .map_err(Error::Api)?;

            if page.items.is_empty() {
                break;
            }
            let has_next = page.next.is_some();
            members.extend(page.items.into_iter().map(|m| m.login));

            if !has_next {
                break;
            }
            page_num += 1;
        }

        Ok(members)
    }

    /// Fork `org/repo` into the authenticated account
    ///
    /// GitHub answers with the existing fork when there already is one, which
    /// may carry a different name; that name is returned.
    pub async fn fork(&self, owner: &str, org: &str, repo: &str) -> Result<String> {
        let fork = self
            .client()
            .repos(org, repo)
            .create_fork()
            .send()
            .await
            .map_err(Error::Api)?;

        let fork_owner = fork
            .owner
            .as_ref()
            .map(|o| o.login.as_str())
            .unwrap_or_default();
        if !fork_owner.eq_ignore_ascii_case(owner) {
            warn!(
                expected = owner,
                actual = fork_owner,
                "Fork created under an unexpected account"
            );
        }

        info!(org, repo, fork = %fork.name, "Fork ready");
        Ok(fork.name)
    }
}
