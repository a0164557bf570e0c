//! Duplicate filter
//!
//! The only record of past cherry-picks is the platform itself: every PR we
//! open carries `(#<source>)[<branch>]` in its title. Before doing any work
//! the candidate branches are checked against that marker.

use std::collections::HashSet;

use tracing::info;

use crate::types::PullRequest;

/// Title marker identifying the cherry-pick of `source` onto `branch`
pub fn title_marker(source: u64, branch: &str) -> String {
    format!("(#{})[{}]", source, branch)
}

/// Knows which (source PR, branch) pairs were already picked
pub trait PickLedger {
    fn already_picked(&self, source: u64, branch: &str) -> bool;
}

/// Ledger derived from existing pull request titles
#[derive(Debug, Clone, Default)]
pub struct TitleLedger {
    titles: Vec<String>,
}

impl TitleLedger {
    pub fn from_pull_requests(prs: &[PullRequest]) -> Self {
        Self {
            titles: prs.iter().map(|pr| pr.title.clone()).collect(),
        }
    }
}

impl PickLedger for TitleLedger {
    fn already_picked(&self, source: u64, branch: &str) -> bool {
        let marker = title_marker(source, branch);
        self.titles.iter().any(|title| title.contains(&marker))
    }
}

/// Drop branches the ledger has already seen, keeping order
pub fn filter_picked<L: PickLedger + ?Sized>(
    ledger: &L,
    source: u64,
    branches: Vec<String>,
) -> Vec<String> {
    let mut seen = HashSet::new();
    branches
        .into_iter()
        .filter(|branch| seen.insert(branch.clone()))
        .filter(|branch| {
            let picked = ledger.already_picked(source, branch);
            if picked {
                info!(pr = source, branch = %branch, "Cherry-pick already exists, skipping");
            }
            !picked
        })
        .collect()
}
