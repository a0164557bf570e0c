//! Target resolution: which branches does an event ask for?
//!
//! Comments are scanned line by line for `<command> <branch>`; labels are
//! matched against the configured prefix. Only trusted commenters count,
//! where trust is either org membership or an allow-all override.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::config::RepoConfig;
use crate::platform::Platform;
use crate::types::{IssueComment, Trigger};
use crate::Result;

/// Extract requested branches from a comment body
///
/// Every line of the form `<command> <branch>` yields one branch. Trailing
/// carriage returns are ignored and anything else on the line after the
/// branch name is dropped. Malformed lines are skipped silently.
pub fn parse_command_branches(body: &str, command: &str) -> Vec<String> {
    if command.is_empty() {
        return Vec::new();
    }

    body.lines()
        .filter_map(|line| {
            let rest = line.trim_end_matches('\r').strip_prefix(command)?;
            // "/cherrypickfoo" is not the command
            if !rest.starts_with(char::is_whitespace) {
                return None;
            }
            rest.split_whitespace().next().map(str::to_string)
        })
        .collect()
}

/// Branches requested by labels carrying the configured prefix
pub fn label_branches(labels: &[String], config: &RepoConfig) -> Vec<String> {
    labels
        .iter()
        .filter(|label| config.is_trigger_label(label))
        .map(|label| label[config.label_prefix.len()..].trim().to_string())
        .filter(|branch| !branch.is_empty())
        .collect()
}

/// A branch someone asked for, and who asked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub branch: String,
    pub actor: String,
    pub trigger: Trigger,
}

/// Ordered set of targets, one per branch
///
/// The first request for a branch wins; later ones naming the same branch
/// (a comment and a label, or two comments) are coalesced into it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TargetSet {
    targets: Vec<Target>,
}

impl TargetSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a target; returns false if the branch was already present
    pub fn insert(
        &mut self,
        branch: impl Into<String>,
        actor: impl Into<String>,
        trigger: Trigger,
    ) -> bool {
        let branch = branch.into();
        if self.contains(&branch) {
            return false;
        }
        self.targets.push(Target {
            branch,
            actor: actor.into(),
            trigger,
        });
        true
    }

    pub fn contains(&self, branch: &str) -> bool {
        self.targets.iter().any(|t| t.branch == branch)
    }

    /// Branch names in request order
    pub fn branches(&self) -> Vec<String> {
        self.targets.iter().map(|t| t.branch.clone()).collect()
    }

    /// Keep only the targets whose branch is listed
    pub fn retain_branches(&mut self, keep: &[String]) {
        self.targets.retain(|t| keep.contains(&t.branch));
    }

    /// Remove a branch, returning its target if present
    pub fn remove(&mut self, branch: &str) -> Option<Target> {
        let idx = self.targets.iter().position(|t| t.branch == branch)?;
        Some(self.targets.remove(idx))
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Target> {
        self.targets.iter()
    }
}

impl IntoIterator for TargetSet {
    type Item = Target;
    type IntoIter = std::vec::IntoIter<Target>;

    fn into_iter(self) -> Self::IntoIter {
        self.targets.into_iter()
    }
}

/// Decides whether a commenter may request cherry-picks
#[async_trait]
pub trait TrustProvider: Send + Sync {
    async fn is_trusted(&self, user: &str) -> Result<bool>;
}

/// Everyone is trusted
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAll;

#[async_trait]
impl TrustProvider for AllowAll {
    async fn is_trusted(&self, _user: &str) -> Result<bool> {
        Ok(true)
    }
}

/// Trust org members, asking the platform per user
pub struct OrgMembership {
    platform: Arc<dyn Platform>,
    org: String,
}

impl OrgMembership {
    pub fn new(platform: Arc<dyn Platform>, org: impl Into<String>) -> Self {
        Self {
            platform,
            org: org.into(),
        }
    }
}

#[async_trait]
impl TrustProvider for OrgMembership {
    async fn is_trusted(&self, user: &str) -> Result<bool> {
        self.platform.is_member(&self.org, user).await
    }
}

/// Trust org members from a single membership listing
///
/// Used when many historical comments have to be checked at once.
#[derive(Debug, Clone, Default)]
pub struct MemberRoster {
    members: HashSet<String>,
}

impl MemberRoster {
    pub fn new(members: impl IntoIterator<Item = String>) -> Self {
        Self {
            members: members.into_iter().collect(),
        }
    }

    pub async fn fetch(platform: &dyn Platform, org: &str) -> Result<Self> {
        let members = platform.list_org_members(org).await?;
        debug!(org, count = members.len(), "Fetched org members");
        Ok(Self::new(members))
    }
}

#[async_trait]
impl TrustProvider for MemberRoster {
    async fn is_trusted(&self, user: &str) -> Result<bool> {
        Ok(self.members.contains(user))
    }
}

/// Trust provider for a single live comment
pub fn comment_trust(
    config: &RepoConfig,
    platform: Arc<dyn Platform>,
    org: &str,
) -> Box<dyn TrustProvider> {
    if config.allow_all {
        Box::new(AllowAll)
    } else {
        Box::new(OrgMembership::new(platform, org))
    }
}

/// Trust provider for scanning a PR's comment history
pub async fn history_trust(
    config: &RepoConfig,
    platform: &dyn Platform,
    org: &str,
) -> Result<Box<dyn TrustProvider>> {
    if config.allow_all {
        Ok(Box::new(AllowAll))
    } else {
        Ok(Box::new(MemberRoster::fetch(platform, org).await?))
    }
}

/// Collect comment-requested targets from a PR's comment history
pub async fn targets_from_comments(
    comments: &[IssueComment],
    config: &RepoConfig,
    trust: &dyn TrustProvider,
    targets: &mut TargetSet,
) -> Result<()> {
    for comment in comments {
        let branches = parse_command_branches(&comment.body, &config.command);
        if branches.is_empty() {
            continue;
        }

        if !trust.is_trusted(&comment.author).await? {
            debug!(user = %comment.author, "Ignoring cherry-pick request from untrusted user");
            continue;
        }

        for branch in branches {
            targets.insert(branch, comment.author.clone(), Trigger::Comment);
        }
    }

    Ok(())
}

/// Collect label-requested targets, attributed to `actor`
pub fn targets_from_labels(
    labels: &[String],
    config: &RepoConfig,
    actor: &str,
    targets: &mut TargetSet,
) {
    for branch in label_branches(labels, config) {
        targets.insert(branch, actor, Trigger::Label);
    }
}
