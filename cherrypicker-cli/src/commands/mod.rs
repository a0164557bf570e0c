//! CLI command implementations

pub mod event;
pub mod pick;

pub use event::EventArgs;
pub use pick::PickArgs;

use std::sync::Arc;

use cherrypicker_core::{CherryPicker, Config, ConfigStore, EventReport, LocalGit, Secrets};
use cherrypicker_github::GitHubClient;

/// Wire the GitHub client and local git layer into an orchestrator
pub fn build_picker(config: Config) -> anyhow::Result<CherryPicker> {
    let secrets = Secrets::load()?;
    let token = secrets.require_github_token()?;

    let github = GitHubClient::new(token.clone())?;
    let git = LocalGit::from_config(&config, Some(token))?;

    tracing::debug!(cache_dir = %git.cache_dir().display(), "Using clone cache");

    Ok(CherryPicker::new(
        Arc::new(github),
        Arc::new(git),
        Arc::new(ConfigStore::new(config)),
    ))
}

/// Print one line per branch and fail if any branch failed
pub fn print_report(report: &EventReport) -> anyhow::Result<()> {
    if report.is_empty() {
        println!("Nothing to cherry-pick.");
        return Ok(());
    }

    for result in &report.results {
        match &result.outcome {
            Ok(outcome) => println!("  {}: {:?}", result.branch, outcome),
            Err(e) => println!("  {}: failed: {}", result.branch, e),
        }
    }

    let failed = report.failures().count();
    if failed > 0 {
        anyhow::bail!("{} of {} branches failed", failed, report.results.len());
    }
    Ok(())
}
