//! Metadata for the cherry-pick pull request

use crate::config::RepoConfig;
use crate::dedup::title_marker;
use crate::types::{CherryPickRequest, NewBranchSpec, NewPullRequestSpec, PullRequest};

/// Title of the cherry-pick PR; carries the de-duplication marker
pub fn pick_title(source: &PullRequest, target_branch: &str) -> String {
    format!("{} {}", source.title, title_marker(source.number, target_branch))
}

pub fn pick_body(source: &PullRequest) -> String {
    let mut body = format!("This is an automated cherry-pick of #{}", source.number);
    if !source.body.is_empty() {
        body.push_str("\n\n");
        body.push_str(&source.body);
    }
    body
}

/// Source labels worth carrying over, plus the optional "picked" label
pub fn pick_labels(source: &PullRequest, target_branch: &str, config: &RepoConfig) -> Vec<String> {
    let mut labels: Vec<String> = source
        .labels
        .iter()
        .filter(|label| !config.exclude_labels.contains(label))
        .filter(|label| !config.is_trigger_label(label))
        .cloned()
        .collect();

    let picked_prefix = config
        .picked_label_prefix
        .as_deref()
        .filter(|p| !p.is_empty());
    if let Some(prefix) = picked_prefix {
        let picked = format!("{}{}", prefix, target_branch);
        if !labels.contains(&picked) {
            labels.push(picked);
        }
    }

    labels
}

/// Who gets assigned: the requester, or the original assignees when the
/// bot itself triggered the pick
pub fn pick_assignees(source: &PullRequest, actor: &str, bot_login: &str) -> Vec<String> {
    if actor == bot_login {
        source.assignees.clone()
    } else {
        vec![actor.to_string()]
    }
}

/// Assemble the full PR spec for one cherry-pick
pub fn build_pull_request(
    source: &PullRequest,
    request: &CherryPickRequest,
    branch: &NewBranchSpec,
    config: &RepoConfig,
    bot_login: &str,
) -> NewPullRequestSpec {
    NewPullRequestSpec {
        title: pick_title(source, &request.target_branch),
        body: pick_body(source),
        head: branch.head(),
        base: request.target_branch.clone(),
        labels: pick_labels(source, &request.target_branch, config),
        reviewers: source.requested_reviewers.clone(),
        assignees: pick_assignees(source, &request.actor, bot_login),
    }
}
