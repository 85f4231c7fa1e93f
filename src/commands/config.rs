//! Config command implementation.

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;

/// Print the effective configuration as YAML, or save it to `write`
pub async fn run(config: &Config, write: Option<&Path>) -> Result<()> {
    match write {
        Some(path) => {
            config.save(path)?;
            println!("[OK] Configuration written to {}", path.display());
        }
        None => {
            let yaml = serde_yaml::to_string(config).context("Failed to serialize config")?;
            print!("{}", yaml);
        }
    }
    Ok(())
}
