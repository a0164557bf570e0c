//! Pick command - cherry-pick a merged PR by hand

use clap::Args;
use cherrypicker_core::{Config, RepoKey};

use super::{build_picker, print_report};

/// Cherry-pick a merged pull request onto one or more branches
#[derive(Args, Debug)]
pub struct PickArgs {
    /// Repository (org/repo format)
    #[arg(short, long)]
    pub repo: String,

    /// Number of the merged pull request
    #[arg(short, long)]
    pub pr: u64,

    /// Target branch (repeatable)
    #[arg(short, long = "branch", required = true)]
    pub branches: Vec<String>,

    /// Login the request is made on behalf of (defaults to the bot)
    #[arg(long)]
    pub actor: Option<String>,
}

impl PickArgs {
    /// Execute the pick command
    pub async fn execute(&self, config: Config) -> anyhow::Result<()> {
        let repo = RepoKey::parse(&self.repo)?;
        let actor = self
            .actor
            .clone()
            .unwrap_or_else(|| config.bot.login.clone());

        println!(
            "Cherry-picking {}#{} onto {}",
            repo,
            self.pr,
            self.branches.join(", ")
        );

        let picker = build_picker(config)?;
        let report = picker
            .pick(repo, self.pr, self.branches.clone(), &actor)
            .await?;

        print_report(&report)
    }
}
