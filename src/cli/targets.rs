use anyhow::Result;
use clap::Args;

use sidekick::generation::TargetRegistry;

/// List supported assistants
#[derive(Args)]
pub struct TargetsCommand {
    /// Print the table as JSON
    #[arg(long = "json")]
    pub json: bool,
}

impl TargetsCommand {
    pub fn execute(&self) -> Result<()> {
        let registry = TargetRegistry::builtin();

        if self.json {
            let targets: Vec<_> = registry.iter().collect();
            println!("{}", serde_json::to_string_pretty(&targets)?);
            return Ok(());
        }

        println!("{:<10} {:<18} {}", "ID", "ASSISTANT", "FILE");
        for target in registry.iter() {
            println!("{:<10} {:<18} {}", target.id, target.display_name, target.filename);
        }
        Ok(())
    }
}
