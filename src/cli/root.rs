use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use sidekick::config::Config;

use super::{ask::AskCommand, generate::GenerateCommand, targets::TargetsCommand};

/// Sidekick - context files for your coding agents
#[derive(Parser)]
#[command(
    name = "sidekick",
    version,
    about = "Generate markdown context files for AI coding assistants from a public repository",
    long_about = r#"Sidekick analyzes a public GitHub repository through DeepWiki and writes the
context file each coding assistant expects (claude.md, project_general.md, ...).

Examples:
  sidekick generate octocat/Hello-World -t claude
  sidekick generate https://github.com/octocat/Hello-World -t claude -t cursor -o out/
  sidekick ask --repo octocat/Hello-World "How are tests organized?"
  sidekick targets"#
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short = 'd', long = "debug", global = true)]
    pub debug: bool,

    /// Configuration file to use instead of the default search path
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate context files for one or more assistants
    Generate(GenerateCommand),
    /// Ask a question about a repository, or a general one
    Ask(AskCommand),
    /// List supported assistants
    Targets(TargetsCommand),
}

impl Cli {
    pub async fn execute(self) -> Result<()> {
        if self.debug {
            debug!("Debug logging enabled");
        }

        match self.command {
            Commands::Targets(cmd) => cmd.execute(),
            Commands::Generate(cmd) => {
                let config = Config::init(self.config.as_deref()).await?;
                debug!("Configuration initialized");
                cmd.execute(&config).await
            }
            Commands::Ask(cmd) => {
                let config = Config::init(self.config.as_deref()).await?;
                debug!("Configuration initialized");
                cmd.execute(&config).await
            }
        }
    }
}
