//! Conflict handling: turn a failed patch into an issue and/or comment

use tracing::{info, warn};

use crate::metadata::pick_assignees;
use crate::platform::Platform;
use crate::types::{CherryPickRequest, NewIssue, PullRequest};
use crate::Result;

/// Outcome of a patch that would not apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictRecord {
    pub reason: String,
    /// Tracking issue, when one was opened
    pub issue: Option<u64>,
}

fn issue_for(
    source: &PullRequest,
    request: &CherryPickRequest,
    reason: &str,
    bot_login: &str,
) -> NewIssue {
    NewIssue {
        title: format!("[{}] {}", request.target_branch, source.title),
        body: format!(
            "This issue was created automatically in response to a cherry-pick {trigger}.\n\n\
             It was not possible to cherry-pick #{number} onto `{branch}` because the \
             patch did not apply cleanly:\n\n```\n{reason}\n```\n\n\
             Please resolve the conflicts manually and open a pull request against `{branch}`.",
            trigger = request.trigger,
            number = source.number,
            branch = request.target_branch,
            reason = reason.trim_end(),
        ),
        labels: Vec::new(),
        assignees: pick_assignees(source, &request.actor, bot_login),
    }
}

/// Report a conflict back to the requester
///
/// With `create_issue` a tracking issue is opened and the source PR gets a
/// comment pointing at it; otherwise the comment carries the failure itself.
/// Errors from the platform are returned as the branch's terminal error.
pub async fn report_conflict(
    platform: &dyn Platform,
    source: &PullRequest,
    request: &CherryPickRequest,
    reason: &str,
    create_issue: bool,
    bot_login: &str,
) -> Result<ConflictRecord> {
    let org = &request.repo.org;
    let repo = &request.repo.repo;

    warn!(
        repo = %request.repo,
        pr = source.number,
        branch = %request.target_branch,
        reason,
        "Patch did not apply"
    );

    if create_issue {
        let issue = issue_for(source, request, reason, bot_login);
        let number = platform.create_issue(org, repo, &issue).await?;
        info!(repo = %request.repo, issue = number, "Opened tracking issue for failed cherry-pick");

        let message = format!("new issue created for failed cherrypick: #{}", number);
        platform
            .create_comment(org, repo, source.number, &request.reply(&message))
            .await?;

        return Ok(ConflictRecord {
            reason: reason.to_string(),
            issue: Some(number),
        });
    }

    let message = format!(
        "#{} failed to apply on top of branch \"{}\":\n```\n{}\n```",
        source.number,
        request.target_branch,
        reason.trim_end()
    );
    platform
        .create_comment(org, repo, source.number, &request.reply(&message))
        .await?;

    Ok(ConflictRecord {
        reason: reason.to_string(),
        issue: None,
    })
}
