//! Config command - view the resolved configuration

use std::path::Path;

use anyhow::{Context, Result};
use clap::Subcommand;

use objsync_core::config::Config;

use crate::output::{get_formatter, OutputFormat};

/// Configuration subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Print the resolved configuration as YAML
    Show,
    /// Print the configuration file path in use
    Path,
}

impl ConfigCommand {
    /// Execute the config command.
    pub fn execute(&self, format: OutputFormat, config: Config, path: &Path) -> Result<()> {
        let formatter = get_formatter(matches!(format, OutputFormat::Json));
        match self {
            ConfigCommand::Show => {
                let yaml =
                    serde_yaml::to_string(&config).context("Failed to render configuration")?;
                formatter.print_json(&serde_json::json!({
                    "config": serde_yaml::from_str::<serde_json::Value>(&yaml)
                        .unwrap_or_default(),
                }));
                if matches!(format, OutputFormat::Human) {
                    print!("{yaml}");
                }
            }
            ConfigCommand::Path => {
                formatter.print_json(&serde_json::json!({
                    "path": path.display().to_string(),
                }));
                if matches!(format, OutputFormat::Human) {
                    println!("{}", path.display());
                }
            }
        }
        Ok(())
    }
}
