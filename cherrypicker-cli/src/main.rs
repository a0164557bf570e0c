//! Cherrypicker CLI - Command line interface for the cherry-pick bot
//!
//! Runs cherry-picks by hand or replays webhook deliveries.

mod commands;

use std::path::PathBuf;

use cherrypicker_core::{Config, Secrets};
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::{EventArgs, PickArgs};

/// Cherrypicker: cherry-pick merged pull requests onto other branches
#[derive(Parser, Debug)]
#[command(name = "cherrypicker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to ~/.config/cherrypicker/config.toml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Bot login owning the forks (overrides config and env)
    #[arg(long, global = true, env = "CHERRYPICKER_BOT_LOGIN")]
    bot_login: Option<String>,

    /// Directory for cached clones (overrides config and env)
    #[arg(long, global = true, env = "CHERRYPICKER_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show version information
    Version,

    /// Cherry-pick a merged pull request
    #[command(visible_alias = "p")]
    Pick(PickArgs),

    /// Replay a webhook payload
    Event(EventArgs),

    /// Show current configuration
    Config,

    /// Create a secrets file template
    InitSecrets,
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    // Load configuration with overrides
    let config = Config::load_with_overrides(
        cli.config.as_deref(),
        cli.bot_login.clone(),
        cli.cache_dir.clone(),
    )?;

    if cli.verbose {
        tracing::debug!(
            bot = %config.bot.login,
            repos = config.cherrypicker.len(),
            "Configuration loaded"
        );
    }

    match cli.command {
        Some(Commands::Version) => {
            println!("cherrypicker {}", env!("CARGO_PKG_VERSION"));
        }
        Some(Commands::Pick(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Event(args)) => {
            args.execute(config).await?;
        }
        Some(Commands::Config) => {
            print_config(&config, cli.config.as_deref());
        }
        Some(Commands::InitSecrets) => {
            let path = Secrets::create_template()?;
            println!("Created secrets template at {}", path.display());
            println!("Add your GitHub token, then keep the file at mode 0600.");
        }
        None => {
            println!("Cherrypicker - cherry-pick merged pull requests onto other branches");
            println!();
            println!("Use --help for usage information");
        }
    }

    Ok(())
}

fn print_config(config: &Config, explicit: Option<&std::path::Path>) {
    println!("Cherrypicker Configuration");
    println!("==========================");
    println!();
    println!("Bot:");
    println!("  login: {}", config.bot.login);
    println!("  email: {}", config.bot.email);
    println!();
    println!("Git:");
    match &config.git.cache_dir {
        Some(dir) => println!("  cache_dir: {}", dir.display()),
        None => println!("  cache_dir: (default)"),
    }
    println!("  remote_host: {}", config.git.remote_host);
    println!();

    if config.cherrypicker.is_empty() {
        println!("No repositories configured.");
    }
    for entry in &config.cherrypicker {
        println!("Repos: {}", entry.repos.join(", "));
        println!("  command: {}", entry.command);
        println!("  label_prefix: {}", entry.label_prefix);
        if let Some(prefix) = &entry.picked_label_prefix {
            println!("  picked_label_prefix: {}", prefix);
        }
        if !entry.exclude_labels.is_empty() {
            println!("  exclude_labels: {}", entry.exclude_labels.join(", "));
        }
        println!("  allow_all: {}", entry.allow_all);
        println!("  create_issue_on_conflict: {}", entry.create_issue_on_conflict);
    }
    println!();

    let path = explicit
        .map(|p| p.to_path_buf())
        .or_else(Config::default_config_path);
    if let Some(path) = path {
        println!("Config file: {}", path.display());
        if path.exists() {
            println!("  (exists)");
        } else {
            println!("  (not found - using defaults)");
        }
    }
}
