//! Whois command implementation: runs the lookup and country heuristic for
//! a single address.

use anyhow::{Context, Result};

use crate::cmd_abstraction::{CommandExecutor, RealCommandExecutor};
use crate::config::Config;
use crate::error::NdefenceError;
use crate::validation::validate_ipv4;
use crate::whois::{RegistryCountryExtractor, WhoisLookup, WhoisResolver};

/// Run the whois command
pub async fn run(ip: &str, config: &Config) -> Result<()> {
    let executor = RealCommandExecutor::new();
    print!("{}", describe(ip, &executor, &config.whois_command)?);
    Ok(())
}

fn describe(ip: &str, executor: &dyn CommandExecutor, command: &str) -> Result<String> {
    validate_ipv4(ip)?;

    let extractor = RegistryCountryExtractor::new().context("Failed to compile country pattern")?;
    let resolver = WhoisResolver::new(executor, command, Box::new(extractor));

    match resolver.lookup(ip) {
        WhoisLookup::Record(text) => Ok(format!(
            "{}\n\nCountry: {}\n",
            text.trim_end(),
            resolver.country_of(&text)
        )),
        WhoisLookup::NoRecord => Ok(format!("No whois record for {}\n", ip)),
        WhoisLookup::Failed => Err(NdefenceError::ExternalProcess(format!(
            "'{} {}' failed; is a whois client installed?",
            command, ip
        ))
        .into()),
    }
}
