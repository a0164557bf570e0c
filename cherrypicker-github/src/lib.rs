//! Cherrypicker GitHub - GitHub integration for the cherry-pick bot
//!
//! This crate implements the core `Platform` trait against the GitHub REST
//! API: pull requests and their patches, issues, comments, labels, org
//! membership and forks.

mod client;
mod error;
mod issues;
mod orgs;
mod platform;
mod pr;

pub use client::{GitHubClient, DEFAULT_API_BASE};
pub use error::{Error, Result};
pub use pr::convert_pull_request;
