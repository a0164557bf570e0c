//! Event handlers
//!
//! Each handler resolves the event into a [`TargetSet`], drops branches that
//! were already picked, and runs one task per remaining branch. Branch tasks
//! are independent: a failure in one is recorded in the [`EventReport`] and
//! never stops the others.

use std::sync::Arc;

use tracing::{debug, error, info, instrument};

use crate::config::RepoConfig;
use crate::dedup::{filter_picked, TitleLedger};
use crate::events::{IssueCommentAction, IssueCommentEvent, PullRequestAction, PullRequestEvent};
use crate::pipeline::{CherryPicker, PickOutcome};
use crate::resolve::{
    comment_trust, history_trust, parse_command_branches, targets_from_comments,
    targets_from_labels, Target, TargetSet,
};
use crate::types::{CherryPickRequest, PrState, PullRequest, RepoKey, Trigger};
use crate::{Error, Result};

/// How one requested branch ended
#[derive(Debug)]
pub struct BranchResult {
    pub branch: String,
    pub outcome: Result<PickOutcome>,
}

/// Per-branch results of one event, in request order
#[derive(Debug, Default)]
pub struct EventReport {
    pub results: Vec<BranchResult>,
}

impl EventReport {
    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Numbers of the pull requests opened
    pub fn created(&self) -> Vec<u64> {
        self.results
            .iter()
            .filter_map(|r| match r.outcome {
                Ok(PickOutcome::Created { number }) => Some(number),
                _ => None,
            })
            .collect()
    }

    pub fn failures(&self) -> impl Iterator<Item = &BranchResult> {
        self.results.iter().filter(|r| r.outcome.is_err())
    }

    pub fn has_failures(&self) -> bool {
        self.failures().next().is_some()
    }
}

fn request_for(repo: &RepoKey, source: &PullRequest, target: &Target) -> CherryPickRequest {
    CherryPickRequest {
        source: source.number,
        repo: repo.clone(),
        target_branch: target.branch.clone(),
        actor: target.actor.clone(),
        trigger: target.trigger,
    }
}

fn base_branch_reason(base: &str, target: &str) -> String {
    format!(
        "base branch ({}) needs to differ from target branch ({})",
        base, target
    )
}

impl CherryPicker {
    /// Handle an `issue_comment` delivery
    #[instrument(skip_all, fields(repo = %event.repository.key(), pr = event.issue.number))]
    pub async fn handle_issue_comment(&self, event: &IssueCommentEvent) -> Result<EventReport> {
        if event.action != IssueCommentAction::Created || !event.issue.is_pull_request() {
            return Ok(EventReport::default());
        }

        let key = event.repository.key();
        let config = self.config();
        let Some(repo_config) = config.for_repo(&key.org, &key.repo) else {
            debug!("Repository not configured for cherry-picks");
            return Ok(EventReport::default());
        };

        let branches = parse_command_branches(&event.comment.body, &repo_config.command);
        if branches.is_empty() {
            return Ok(EventReport::default());
        }

        let actor = event.comment.user.login.as_str();
        let trust = comment_trust(repo_config, self.platform_arc(), &key.org);
        if !trust.is_trusted(actor).await? {
            debug!(user = actor, "Ignoring cherry-pick request from untrusted user");
            return Ok(EventReport::default());
        }

        let source = self
            .platform()
            .get_pull_request(&key.org, &key.repo, event.issue.number)
            .await?;

        let mut targets = TargetSet::new();
        for branch in branches {
            targets.insert(branch, actor, Trigger::Comment);
        }

        if !source.merged {
            if source.state == PrState::Open {
                self.defer_until_merge(&key, &source, targets, repo_config)
                    .await?;
            } else {
                debug!("Pull request closed without merging");
            }
            return Ok(EventReport::default());
        }

        self.run_targets(key, source, targets, repo_config.clone())
            .await
    }

    /// Handle a `pull_request` delivery
    ///
    /// A merge honours cherry-pick comments already on the PR as well as its
    /// labels. Adding any label to a merged PR rescans all of its trigger
    /// labels; branches already picked are dropped by the title check.
    #[instrument(skip_all, fields(repo = %event.repository.key(), pr = event.number))]
    pub async fn handle_pull_request(&self, event: &PullRequestEvent) -> Result<EventReport> {
        if !matches!(
            event.action,
            PullRequestAction::Closed | PullRequestAction::Labeled
        ) {
            return Ok(EventReport::default());
        }
        if !event.pull_request.merged {
            debug!("Pull request not merged");
            return Ok(EventReport::default());
        }

        let key = event.repository.key();
        let config = self.config();
        let Some(repo_config) = config.for_repo(&key.org, &key.repo) else {
            debug!("Repository not configured for cherry-picks");
            return Ok(EventReport::default());
        };

        debug!(
            action = ?event.action,
            label = ?event.label.as_ref().map(|l| l.name.as_str()),
            "Scanning pull request for cherry-pick requests"
        );

        let platform = self.platform();
        let source = platform
            .get_pull_request(&key.org, &key.repo, event.number)
            .await?;

        let mut targets = TargetSet::new();
        if event.action == PullRequestAction::Closed {
            let comments = platform
                .list_issue_comments(&key.org, &key.repo, event.number)
                .await?;
            let trust = history_trust(repo_config, platform, &key.org).await?;
            targets_from_comments(&comments, repo_config, trust.as_ref(), &mut targets).await?;
        }

        let labels = platform
            .get_issue_labels(&key.org, &key.repo, event.number)
            .await?;
        targets_from_labels(&labels, repo_config, &source.author, &mut targets);

        if targets.is_empty() {
            return Ok(EventReport::default());
        }

        self.run_targets(key, source, targets, repo_config.clone())
            .await
    }

    /// Cherry-pick a merged PR onto `branches` on behalf of `actor`
    ///
    /// Behaves as if `actor` had commented `/cherrypick <branch>` for each
    /// branch, minus the trust check.
    pub async fn pick(
        &self,
        repo: RepoKey,
        number: u64,
        branches: Vec<String>,
        actor: &str,
    ) -> Result<EventReport> {
        let config = self.config();
        let repo_config = config
            .for_repo(&repo.org, &repo.repo)
            .cloned()
            .unwrap_or_default();

        let source = self
            .platform()
            .get_pull_request(&repo.org, &repo.repo, number)
            .await?;
        if !source.merged {
            return Err(Error::Other(format!("{}#{} is not merged", repo, number)));
        }

        let mut targets = TargetSet::new();
        for branch in branches {
            targets.insert(branch, actor, Trigger::Comment);
        }

        self.run_targets(repo, source, targets, repo_config).await
    }

    /// Record requests on an open PR so they run once it merges
    async fn defer_until_merge(
        &self,
        repo: &RepoKey,
        source: &PullRequest,
        targets: TargetSet,
        repo_config: &RepoConfig,
    ) -> Result<()> {
        let platform = self.platform();

        for target in targets {
            let request = request_for(repo, source, &target);

            if target.branch == source.base_ref {
                let reason = base_branch_reason(&source.base_ref, &target.branch);
                platform
                    .create_comment(&repo.org, &repo.repo, source.number, &request.reply(&reason))
                    .await?;
                continue;
            }

            if !repo_config.label_prefix.is_empty() {
                let label = format!("{}{}", repo_config.label_prefix, target.branch);
                if !source.labels.contains(&label) {
                    platform
                        .add_label(&repo.org, &repo.repo, source.number, &label)
                        .await?;
                }
            }

            let message = format!(
                "once the present PR merges, I will cherry-pick it on top of {} in a new PR and assign it to you.",
                target.branch
            );
            platform
                .create_comment(&repo.org, &repo.repo, source.number, &request.reply(&message))
                .await?;
            info!(branch = %target.branch, "Deferred cherry-pick until merge");
        }

        Ok(())
    }

    async fn run_targets(
        &self,
        repo: RepoKey,
        source: PullRequest,
        mut targets: TargetSet,
        repo_config: RepoConfig,
    ) -> Result<EventReport> {
        let platform = self.platform();
        let mut report = EventReport::default();

        if let Some(target) = targets.remove(&source.base_ref) {
            let request = request_for(&repo, &source, &target);
            let reason = base_branch_reason(&source.base_ref, &target.branch);
            platform
                .create_comment(&repo.org, &repo.repo, source.number, &request.reply(&reason))
                .await?;
            report.results.push(BranchResult {
                branch: target.branch,
                outcome: Ok(PickOutcome::Rejected { reason }),
            });
        }

        let existing = platform.get_pull_requests(&repo.org, &repo.repo).await?;
        let ledger = TitleLedger::from_pull_requests(&existing);
        let remaining = filter_picked(&ledger, source.number, targets.branches());
        targets.retain_branches(&remaining);

        if targets.is_empty() {
            return Ok(report);
        }

        info!(branches = ?targets.branches(), "Starting cherry-picks");

        let source = Arc::new(source);
        let repo_config = Arc::new(repo_config);
        let mut tasks = Vec::with_capacity(targets.len());

        for target in targets {
            let request = request_for(&repo, &source, &target);
            let picker = self.clone();
            let source = Arc::clone(&source);
            let repo_config = Arc::clone(&repo_config);

            let handle = tokio::spawn(async move {
                picker.cherry_pick(&request, &source, &repo_config).await
            });
            tasks.push((target.branch, handle));
        }

        for (branch, handle) in tasks {
            let outcome = match handle.await {
                Ok(outcome) => outcome,
                Err(e) => Err(Error::Other(format!("cherry-pick task failed: {}", e))),
            };

            match &outcome {
                Ok(result) => info!(branch = %branch, outcome = ?result, "Cherry-pick finished"),
                Err(e) => error!(branch = %branch, error = %e, "Cherry-pick failed"),
            }
            report.results.push(BranchResult { branch, outcome });
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Config, ConfigStore};
    use crate::events::{Comment, Issue, Label, PullRequestPayload, Repository, User};
    use crate::testing::{merged_pr, FakeGit, FakePlatform};
    use crate::types::IssueComment;

    fn config(repo_config: RepoConfig) -> Arc<ConfigStore> {
        Arc::new(ConfigStore::new(Config {
            cherrypicker: vec![RepoConfig {
                repos: vec!["foo/bar".to_string()],
                ..repo_config
            }],
            ..Default::default()
        }))
    }

    fn picker(
        platform: &Arc<FakePlatform>,
        git: &Arc<FakeGit>,
        repo_config: RepoConfig,
    ) -> CherryPicker {
        CherryPicker::new(platform.clone(), git.clone(), config(repo_config))
    }

    fn repository() -> Repository {
        Repository {
            name: "bar".to_string(),
            owner: User {
                login: "foo".to_string(),
            },
        }
    }

    fn comment_event(user: &str, body: &str) -> IssueCommentEvent {
        IssueCommentEvent {
            action: IssueCommentAction::Created,
            issue: Issue {
                number: 2,
                state: PrState::Closed,
                pull_request: Some(serde_json::json!({})),
            },
            comment: Comment {
                body: body.to_string(),
                user: User {
                    login: user.to_string(),
                },
            },
            repository: repository(),
        }
    }

    fn pr_event(action: PullRequestAction, label: Option<&str>) -> PullRequestEvent {
        PullRequestEvent {
            action,
            number: 2,
            pull_request: PullRequestPayload {
                number: 2,
                merged: true,
                user: User {
                    login: "developer".to_string(),
                },
            },
            label: label.map(|name| Label {
                name: name.to_string(),
            }),
            repository: repository(),
            sender: User {
                login: "approver".to_string(),
            },
        }
    }

    fn labelled_source() -> PullRequest {
        PullRequest {
            title: "This is a fix for Y".to_string(),
            body: String::new(),
            labels: vec![
                "cherrypick/release-1.5".to_string(),
                "cherrypick/release-1.6".to_string(),
                "cherrypick/release-1.7".to_string(),
            ],
            ..merged_pr(2)
        }
    }

    #[tokio::test]
    async fn test_comment_on_merged_pr_opens_cherry_pick() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_issue_comment(&comment_event("wiseguy", "/cherrypick stage"))
            .await
            .unwrap();

        assert_eq!(report.created(), vec![1]);
        let created = platform.created_prs();
        assert_eq!(created.len(), 1);
        assert_eq!(created[0].title, "This is a fix for X (#2)[stage]");
        assert_eq!(created[0].head, "ci-robot:cherry-pick-2-to-stage");
        assert_eq!(created[0].base, "stage");
        assert_eq!(
            created[0].body,
            "This is an automated cherry-pick of #2\n\nThis PR updates the magic number."
        );
        assert_eq!(created[0].assignees, vec!["wiseguy".to_string()]);

        let applied = platform.pull_request_state(1).unwrap();
        assert_eq!(applied.requested_reviewers, vec!["user1".to_string()]);
        assert_eq!(applied.assignees, vec!["wiseguy".to_string()]);
    }

    #[tokio::test]
    async fn test_repeated_comment_is_idempotent() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());
        let event = comment_event("wiseguy", "/cherrypick stage");

        picker.handle_issue_comment(&event).await.unwrap();
        let second = picker.handle_issue_comment(&event).await.unwrap();

        assert!(second.is_empty());
        assert_eq!(platform.created_prs().len(), 1);
    }

    #[tokio::test]
    async fn test_untrusted_commenter_is_ignored() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        platform.set_member(false);
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_issue_comment(&comment_event("fan", "/cherrypick stage"))
            .await
            .unwrap();

        assert!(report.is_empty());
        assert!(platform.created_prs().is_empty());
        assert!(platform.comments().is_empty());
        assert!(git.operations().is_empty());
    }

    #[tokio::test]
    async fn test_allow_all_trusts_outsiders() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        platform.set_member(false);
        let git = Arc::new(FakeGit::default());
        let picker = picker(
            &platform,
            &git,
            RepoConfig {
                allow_all: true,
                ..Default::default()
            },
        );

        let report = picker
            .handle_issue_comment(&comment_event("fan", "/cherrypick stage"))
            .await
            .unwrap();
        assert_eq!(report.created().len(), 1);
    }

    #[tokio::test]
    async fn test_unconfigured_repo_is_ignored() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = CherryPicker::new(
            platform.clone(),
            git.clone(),
            Arc::new(ConfigStore::new(Config::default())),
        );

        let report = picker
            .handle_issue_comment(&comment_event("wiseguy", "/cherrypick stage"))
            .await
            .unwrap();
        assert!(report.is_empty());
        assert!(platform.comments().is_empty());
    }

    #[tokio::test]
    async fn test_comment_on_open_pr_is_deferred() {
        let open = PullRequest {
            state: PrState::Open,
            merged: false,
            ..merged_pr(2)
        };
        let platform = Arc::new(FakePlatform::default().with_pull_request(open));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_issue_comment(&comment_event("wiseguy", "/cherrypick release-1.5"))
            .await
            .unwrap();

        assert!(report.is_empty());
        assert_eq!(
            platform.added_labels(),
            vec![(2, "cherrypick/release-1.5".to_string())]
        );
        assert_eq!(
            platform.comments(),
            vec![(
                2,
                "@wiseguy: once the present PR merges, I will cherry-pick it on top of release-1.5 in a new PR and assign it to you."
                    .to_string()
            )]
        );
        assert!(git.operations().is_empty());
        assert!(platform.created_prs().is_empty());
    }

    #[tokio::test]
    async fn test_closed_unmerged_pr_yields_nothing() {
        let closed = PullRequest {
            merged: false,
            ..merged_pr(2)
        };
        let platform = Arc::new(FakePlatform::default().with_pull_request(closed));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_issue_comment(&comment_event("wiseguy", "/cherrypick stage"))
            .await
            .unwrap();
        assert!(report.is_empty());
        assert!(platform.comments().is_empty());
    }

    #[tokio::test]
    async fn test_base_branch_is_rejected() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_issue_comment(&comment_event("wiseguy", "/cherrypick master"))
            .await
            .unwrap();

        assert_eq!(report.results.len(), 1);
        assert!(matches!(
            report.results[0].outcome,
            Ok(PickOutcome::Rejected { .. })
        ));
        assert_eq!(
            platform.comments()[0].1,
            "@wiseguy: base branch (master) needs to differ from target branch (master)"
        );
        assert!(platform.created_prs().is_empty());
        assert!(git.operations().is_empty());
    }

    #[tokio::test]
    async fn test_bot_trigger_keeps_source_assignees() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        picker
            .handle_issue_comment(&comment_event("ci-robot", "/cherrypick stage"))
            .await
            .unwrap();

        assert_eq!(platform.created_prs()[0].assignees, vec!["user2".to_string()]);
    }

    #[tokio::test]
    async fn test_merge_honours_comments_and_labels() {
        let platform = Arc::new(
            FakePlatform::default()
                .with_pull_request(labelled_source())
                .with_members(&["approver", "merge-bot", "developer"])
                .with_comment(IssueComment::new("developer", "a review comment"))
                .with_comment(IssueComment::new("developer", "/cherrypick release-1.5\r")),
        );
        let git = Arc::new(FakeGit::default().with_missing_branch("release-1.7"));
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_pull_request(&pr_event(PullRequestAction::Closed, None))
            .await
            .unwrap();

        let mut titles: Vec<String> = platform
            .created_prs()
            .into_iter()
            .map(|p| p.title)
            .collect();
        titles.sort();
        assert_eq!(
            titles,
            vec![
                "This is a fix for Y (#2)[release-1.5]".to_string(),
                "This is a fix for Y (#2)[release-1.6]".to_string(),
            ]
        );
        for pr in platform.created_prs() {
            assert_eq!(pr.body, "This is an automated cherry-pick of #2");
            assert_eq!(pr.assignees, vec!["developer".to_string()]);
            assert_eq!(pr.reviewers, vec!["user1".to_string()]);
            assert!(pr.labels.is_empty());
        }

        assert_eq!(report.results.len(), 3);
        assert!(!report.has_failures());
        let missing = report
            .results
            .iter()
            .find(|r| r.branch == "release-1.7")
            .unwrap();
        assert!(matches!(missing.outcome, Ok(PickOutcome::Rejected { .. })));
    }

    #[tokio::test]
    async fn test_merge_without_labels_uses_comments() {
        let source = PullRequest {
            labels: Vec::new(),
            ..labelled_source()
        };
        let platform = Arc::new(
            FakePlatform::default()
                .with_pull_request(source)
                .with_members(&["developer"])
                .with_comment(IssueComment::new("developer", "/cherrypick release-1.5\r")),
        );
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        picker
            .handle_pull_request(&pr_event(PullRequestAction::Closed, None))
            .await
            .unwrap();
        assert_eq!(platform.created_prs().len(), 1);
    }

    #[tokio::test]
    async fn test_label_added_after_merge_ignores_comments() {
        let source = PullRequest {
            labels: Vec::new(),
            ..labelled_source()
        };
        let platform = Arc::new(
            FakePlatform::default()
                .with_pull_request(source)
                .with_members(&["developer"])
                .with_comment(IssueComment::new("developer", "/cherrypick release-1.5")),
        );
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_pull_request(&pr_event(
                PullRequestAction::Labeled,
                Some("cherrypick/release-1.5"),
            ))
            .await
            .unwrap();

        assert!(report.is_empty());
        assert!(platform.created_prs().is_empty());
    }

    #[tokio::test]
    async fn test_label_added_after_merge_with_custom_prefix() {
        let source = PullRequest {
            labels: vec![
                "needs-cherry-pick-release-1.5".to_string(),
                "needs-cherry-pick-release-1.6".to_string(),
            ],
            ..labelled_source()
        };
        let platform = Arc::new(FakePlatform::default().with_pull_request(source));
        let git = Arc::new(FakeGit::default());
        let picker = picker(
            &platform,
            &git,
            RepoConfig {
                label_prefix: "needs-cherry-pick-".to_string(),
                ..Default::default()
            },
        );

        let report = picker
            .handle_pull_request(&pr_event(
                PullRequestAction::Labeled,
                Some("needs-cherry-pick-release-1.6"),
            ))
            .await
            .unwrap();

        assert_eq!(report.created().len(), 2);
        // label-triggered requests are attributed to the PR author
        for pr in platform.created_prs() {
            assert_eq!(pr.assignees, vec!["developer".to_string()]);
        }
        assert!(platform
            .comments()
            .iter()
            .all(|(_, body)| body.starts_with("In response to a cherrypick label: ")));
    }

    #[tokio::test]
    async fn test_label_event_rescans_all_trigger_labels() {
        let source = PullRequest {
            labels: vec![
                "cherrypick/release-1.5".to_string(),
                "cherrypick/release-1.6".to_string(),
            ],
            ..labelled_source()
        };
        let platform = Arc::new(FakePlatform::default().with_pull_request(source));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_pull_request(&pr_event(PullRequestAction::Labeled, None))
            .await
            .unwrap();
        assert_eq!(report.created().len(), 2);

        // an unrelated label later finds nothing left to pick
        let again = picker
            .handle_pull_request(&pr_event(PullRequestAction::Labeled, Some("lgtm")))
            .await
            .unwrap();
        assert!(again.is_empty());
        assert_eq!(platform.created_prs().len(), 2);
    }

    #[tokio::test]
    async fn test_label_on_unmerged_pr_is_ignored() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(labelled_source()));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let mut event = pr_event(PullRequestAction::Labeled, Some("cherrypick/release-1.5"));
        event.pull_request.merged = false;

        let report = picker.handle_pull_request(&event).await.unwrap();
        assert!(report.is_empty());
        assert!(platform.created_prs().is_empty());
    }

    #[tokio::test]
    async fn test_comment_and_label_for_same_branch_pick_once() {
        let source = PullRequest {
            labels: vec!["cherrypick/release-1.5".to_string()],
            ..labelled_source()
        };
        let platform = Arc::new(
            FakePlatform::default()
                .with_pull_request(source)
                .with_members(&["approver"])
                .with_comment(IssueComment::new("approver", "/cherrypick release-1.5")),
        );
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        picker
            .handle_pull_request(&pr_event(PullRequestAction::Closed, None))
            .await
            .unwrap();

        let created = platform.created_prs();
        assert_eq!(created.len(), 1);
        // the comment came first and wins
        assert_eq!(created[0].assignees, vec!["approver".to_string()]);
    }

    #[tokio::test]
    async fn test_simultaneous_comment_and_label_open_one_pick() {
        let source = PullRequest {
            labels: vec!["cherrypick/release-1.5".to_string()],
            ..labelled_source()
        };
        let platform = Arc::new(FakePlatform::default().with_pull_request(source));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let comment = comment_event("wiseguy", "/cherrypick release-1.5");
        let label = pr_event(PullRequestAction::Labeled, Some("cherrypick/release-1.5"));
        let (a, b) = tokio::join!(
            picker.handle_issue_comment(&comment),
            picker.handle_pull_request(&label)
        );
        let (a, b) = (a.unwrap(), b.unwrap());

        let titles: Vec<String> = platform
            .created_prs()
            .into_iter()
            .map(|p| p.title)
            .collect();
        assert_eq!(titles, vec!["This is a fix for Y (#2)[release-1.5]".to_string()]);
        assert!(!a.has_failures() && !b.has_failures());

        let outcomes: Vec<&PickOutcome> = a
            .results
            .iter()
            .chain(b.results.iter())
            .filter_map(|r| r.outcome.as_ref().ok())
            .collect();
        assert_eq!(outcomes.len(), 2);
        assert!(outcomes.contains(&&PickOutcome::AlreadyPicked));
    }

    #[tokio::test]
    async fn test_branches_of_one_event_serialize_on_the_repo() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_issue_comment(&comment_event(
                "wiseguy",
                "/cherrypick release-1.5\n/cherrypick release-1.6\n/cherrypick release-1.7",
            ))
            .await
            .unwrap();

        // FakeGit errors on any overlapping operation
        assert!(!report.has_failures(), "{:?}", report);
        assert_eq!(report.created().len(), 3);
        assert_eq!(platform.fork_calls(), 3);
    }

    #[tokio::test]
    async fn test_concurrent_events_on_one_repo_both_succeed() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let first = comment_event("wiseguy", "/cherrypick stage");
        let second = comment_event("approver", "/cherrypick release-1.5");
        let (a, b) = tokio::join!(
            picker.handle_issue_comment(&first),
            picker.handle_issue_comment(&second)
        );

        assert_eq!(a.unwrap().created().len(), 1);
        assert_eq!(b.unwrap().created().len(), 1);
        assert_eq!(platform.created_prs().len(), 2);
    }

    #[tokio::test]
    async fn test_conflict_opens_one_issue_and_one_comment() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default().with_conflict("error: patch failed: bar.go:3"));
        let picker = picker(
            &platform,
            &git,
            RepoConfig {
                create_issue_on_conflict: true,
                ..Default::default()
            },
        );

        let report = picker
            .handle_issue_comment(&comment_event("wiseguy", "/cherrypick stage"))
            .await
            .unwrap();

        let issues = platform.issues();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].body.contains("#2"));
        assert_eq!(issues[0].assignees, vec!["wiseguy".to_string()]);

        let comments = platform.comments();
        assert_eq!(comments.len(), 1);
        assert_eq!(
            comments[0],
            (2, "@wiseguy: new issue created for failed cherrypick: #1".to_string())
        );
        assert!(platform.created_prs().is_empty());
        assert!(matches!(
            report.results[0].outcome,
            Ok(PickOutcome::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_failed_branch_does_not_stop_others() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default().with_push_failure("release-1.6"));
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .handle_issue_comment(&comment_event(
                "wiseguy",
                "/cherrypick release-1.5\n/cherrypick release-1.6\n/cherrypick release-1.7",
            ))
            .await
            .unwrap();

        assert_eq!(report.created().len(), 2);
        let failed: Vec<&str> = report.failures().map(|r| r.branch.as_str()).collect();
        assert_eq!(failed, vec!["release-1.6"]);
        assert!(matches!(report.results[1].outcome, Err(Error::Git(_))));
    }

    #[tokio::test]
    async fn test_fork_error_fails_every_branch() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let store = Arc::new(ConfigStore::new(Config {
            cherrypicker: vec![RepoConfig {
                repos: vec!["foo".to_string()],
                ..Default::default()
            }],
            ..Default::default()
        }));
        let picker = CherryPicker::new(platform.clone(), git.clone(), store);

        let mut event = comment_event("wiseguy", "/cherrypick stage");
        event.repository.name = "error".to_string();

        let report = picker.handle_issue_comment(&event).await.unwrap();
        assert!(report.has_failures());
        assert!(git.operations().is_empty());
    }

    #[tokio::test]
    async fn test_pick_requires_merged_pr() {
        let open = PullRequest {
            state: PrState::Open,
            merged: false,
            ..merged_pr(2)
        };
        let platform = Arc::new(FakePlatform::default().with_pull_request(open));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let result = picker
            .pick(RepoKey::new("foo", "bar"), 2, vec!["stage".to_string()], "wiseguy")
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_pick_runs_requested_branches() {
        let platform = Arc::new(FakePlatform::default().with_pull_request(merged_pr(2)));
        let git = Arc::new(FakeGit::default());
        let picker = picker(&platform, &git, RepoConfig::default());

        let report = picker
            .pick(
                RepoKey::new("foo", "bar"),
                2,
                vec!["stage".to_string(), "stage".to_string()],
                "wiseguy",
            )
            .await
            .unwrap();
        assert_eq!(report.created(), vec![1]);
    }
}
