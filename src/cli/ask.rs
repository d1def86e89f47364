use anyhow::{anyhow, Result};
use clap::Args;
use std::io::{self, Read};
use tracing::{debug, info};

use sidekick::config::Config;
use sidekick::generation::GenerationOrchestrator;

/// Ask a question about a repository, or a general one
#[derive(Args)]
pub struct AskCommand {
    /// Repository URL or owner/repo shorthand; omit for a general question
    #[arg(short = 'r', long = "repo")]
    pub repository: Option<String>,

    /// The question. If not provided, will read from stdin
    pub question: Vec<String>,
}

impl AskCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        debug!("Executing ask command");

        let question = self.get_question()?;
        if question.trim().is_empty() {
            return Err(anyhow!("No question provided. Use arguments or pipe input via stdin."));
        }

        info!("Asking: {}", question.chars().take(50).collect::<String>());

        let orchestrator = GenerationOrchestrator::from_config(config)
            .map_err(|e| anyhow!("Failed to create analysis client: {}", e))?;

        let analysis = orchestrator.ask(self.repository.as_deref(), &question).await?;

        println!("{}", analysis.content);
        if let Some(url) = analysis.view_search_url {
            println!("\nFollow up on DeepWiki: {}", url);
        }

        Ok(())
    }

    fn get_question(&self) -> Result<String> {
        if !self.question.is_empty() {
            Ok(self.question.join(" "))
        } else {
            debug!("Reading question from stdin");
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .map_err(|e| anyhow!("Failed to read from stdin: {}", e))?;
            Ok(buffer)
        }
    }
}
