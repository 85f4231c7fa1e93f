//! CLI command implementations.

pub mod blocklist;
pub mod config;
pub mod run;
pub mod whois;

use anyhow::{Context, Result};
use std::path::Path;

use crate::config::Config;
use crate::error::NdefenceError;

/// Load the config file (or defaults) and apply command-line overrides.
pub fn load_config(config_path: &Path, server_type: Option<&str>) -> Result<Config> {
    let mut config = Config::load_or_default(config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    if let Some(server_type) = server_type {
        config.server_type = server_type.to_string();
        config
            .validate()
            .map_err(|e| NdefenceError::Config(format!("{:#}", e)))?;
    }

    Ok(config)
}
