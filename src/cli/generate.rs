use anyhow::{anyhow, Result};
use clap::Args;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use sidekick::config::Config;
use sidekick::generation::{DownloadPayload, GenerationOrchestrator};

/// Generate context files for one or more assistants
#[derive(Args)]
pub struct GenerateCommand {
    /// Repository URL or owner/repo shorthand
    pub repository: String,

    /// Target assistant id, repeatable (see `sidekick targets`)
    #[arg(short = 't', long = "target", required = true)]
    pub targets: Vec<String>,

    /// Directory the file or archive is written to
    #[arg(short = 'o', long = "output", default_value = ".")]
    pub output_dir: PathBuf,

    /// Print the outcome as JSON
    #[arg(long = "json")]
    pub json: bool,
}

impl GenerateCommand {
    pub async fn execute(&self, config: &Config) -> Result<()> {
        debug!("Executing generate command");

        let orchestrator = GenerationOrchestrator::from_config(config)
            .map_err(|e| anyhow!("Failed to create analysis client: {}", e))?;

        let target_ids: Vec<&str> = self.targets.iter().map(String::as_str).collect();

        let generation = match orchestrator.generate(&self.repository, &target_ids).await {
            Ok(generation) => generation,
            Err(e) => {
                if self.json {
                    println!("{}", serde_json::to_string_pretty(&e.to_payload())?);
                } else if let Some(hint) = e.to_payload().hint_url {
                    eprintln!("See {}", hint);
                }
                return Err(anyhow!(e));
            }
        };

        let files_generated = generation.files_generated();
        let view_search_url = generation.view_search_url.clone();
        let path = write_download(&self.output_dir, generation.output.into_download()).await?;
        info!("Wrote {}", path.display());

        if self.json {
            let summary = json!({
                "success": true,
                "path": path,
                "files_generated": files_generated,
                "view_search_url": view_search_url,
            });
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!("{}", path.display());
            if let Some(url) = view_search_url {
                println!("Follow up on DeepWiki: {}", url);
            }
        }

        Ok(())
    }
}

/// Write the payload into `dir`, creating it when missing
async fn write_download(dir: &Path, payload: DownloadPayload) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|e| anyhow!("Failed to create {}: {}", dir.display(), e))?;

    let path = dir.join(&payload.filename);
    tokio::fs::write(&path, &payload.content_bytes)
        .await
        .map_err(|e| anyhow!("Failed to write {}: {}", path.display(), e))?;

    Ok(path)
}
