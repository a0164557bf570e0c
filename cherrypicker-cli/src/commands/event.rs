//! Event command - replay a webhook delivery from a file

use std::path::PathBuf;

use clap::{Args, ValueEnum};
use cherrypicker_core::{Config, IssueCommentEvent, PullRequestEvent};

use super::{build_picker, print_report};

/// Webhook event type, as in the `X-GitHub-Event` header
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
#[value(rename_all = "snake_case")]
pub enum EventKind {
    IssueComment,
    PullRequest,
}

/// Replay a webhook payload through the matching handler
#[derive(Args, Debug)]
pub struct EventArgs {
    /// Event type
    #[arg(short, long)]
    pub kind: EventKind,

    /// Path to the JSON payload
    #[arg(short, long)]
    pub payload: PathBuf,
}

/// A parsed delivery
#[derive(Debug)]
pub enum Delivery {
    IssueComment(IssueCommentEvent),
    PullRequest(PullRequestEvent),
}

pub fn parse_delivery(kind: EventKind, payload: &str) -> anyhow::Result<Delivery> {
    Ok(match kind {
        EventKind::IssueComment => Delivery::IssueComment(serde_json::from_str(payload)?),
        EventKind::PullRequest => Delivery::PullRequest(serde_json::from_str(payload)?),
    })
}

impl EventArgs {
    /// Execute the event command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let payload = std::fs::read_to_string(&self.payload).map_err(|e| {
            anyhow::anyhow!("Failed to read payload {}: {}", self.payload.display(), e)
        })?;
        let delivery = parse_delivery(self.kind, &payload)?;

        let picker = build_picker(config)?;
        let report = match &delivery {
            Delivery::IssueComment(event) => picker.handle_issue_comment(event).await?,
            Delivery::PullRequest(event) => picker.handle_pull_request(event).await?,
        };

        print_report(&report)
    }
}
