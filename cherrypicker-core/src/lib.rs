//! Cherrypicker Core - Core library for the cherry-pick bot
//!
//! This crate turns `/cherrypick <branch>` comments and cherry-pick labels on
//! merged pull requests into new pull requests against the named branches,
//! serializing all git work per repository.

pub mod config;
pub mod conflict;
pub mod dedup;
pub mod error;
pub mod events;
pub mod git;
pub mod handlers;
pub mod lock;
pub mod metadata;
pub mod pipeline;
pub mod platform;
pub mod resolve;
pub mod secrets;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{Config, ConfigStore, RepoConfig};
pub use error::{Error, Result};
pub use events::{IssueCommentEvent, PullRequestEvent};
pub use git::{GitLayer, LocalGit};
pub use handlers::{BranchResult, EventReport};
pub use pipeline::{CherryPicker, PickOutcome};
pub use platform::Platform;
pub use secrets::Secrets;
pub use types::{CherryPickRequest, PullRequest, RepoKey, Trigger};
