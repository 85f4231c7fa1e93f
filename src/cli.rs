//! CLI argument parsing with clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_PATH;

#[derive(Parser)]
#[command(name = "ndefence")]
#[command(author, version, about = "Access-log analyser building an adaptive IP blocklist")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file path
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH, global = true)]
    pub config: PathBuf,

    /// Web server type, overriding the config file (nginx, apache)
    #[arg(short = 't', long, global = true)]
    pub server_type: Option<String>,

    /// Quiet mode (for cron/systemd timer)
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Verbose mode (debug output)
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Analyse the access log and write reports and blocklist
    Run {
        /// Keep running, one cycle per configured interval
        #[arg(long, short)]
        daemon: bool,

        /// Print each cycle summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Look up one address and show the country heuristic result
    Whois {
        /// IPv4 address to look up
        ip: String,
    },

    /// Inspect the persisted blocklist
    Blocklist {
        #[command(subcommand)]
        action: BlocklistAction,
    },

    /// Print the effective configuration as YAML
    Config {
        /// Save it to this file instead of printing it
        #[arg(long, value_name = "PATH")]
        write: Option<PathBuf>,
    },

    /// Show version
    Version,
}

#[derive(Subcommand, Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlocklistAction {
    /// List persisted entries
    Show,
    /// Drop expired entries and save
    Prune,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_parses_help() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_version_command() {
        let cli = Cli::try_parse_from(["ndefence", "version"]).unwrap();
        assert!(matches!(cli.command, Commands::Version));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
    }

    #[test]
    fn test_cli_run_defaults() {
        let cli = Cli::try_parse_from(["ndefence", "run"]).unwrap();
        match cli.command {
            Commands::Run { daemon, json } => {
                assert!(!daemon);
                assert!(!json);
            }
            _ => panic!("Expected Run command"),
        }
        assert!(cli.server_type.is_none());
    }

    #[test]
    fn test_cli_run_daemon_with_overrides() {
        let cli = Cli::try_parse_from([
            "ndefence",
            "run",
            "--daemon",
            "--json",
            "--server-type",
            "apache",
            "-c",
            "/tmp/nd.yaml",
        ])
        .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Run {
                daemon: true,
                json: true
            }
        ));
        assert_eq!(cli.server_type.as_deref(), Some("apache"));
        assert_eq!(cli.config, PathBuf::from("/tmp/nd.yaml"));
    }

    #[test]
    fn test_cli_whois() {
        let cli = Cli::try_parse_from(["ndefence", "whois", "8.8.8.80"]).unwrap();
        match cli.command {
            Commands::Whois { ip } => assert_eq!(ip, "8.8.8.80"),
            _ => panic!("Expected Whois command"),
        }
    }

    #[test]
    fn test_cli_whois_requires_ip() {
        assert!(Cli::try_parse_from(["ndefence", "whois"]).is_err());
    }

    #[test]
    fn test_cli_blocklist_actions() {
        let cli = Cli::try_parse_from(["ndefence", "blocklist", "prune"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Blocklist {
                action: BlocklistAction::Prune
            }
        ));
    }

    #[test]
    fn test_cli_quiet_verbose_global() {
        let cli = Cli::try_parse_from(["ndefence", "config", "-q"]).unwrap();
        assert!(cli.quiet);
        assert!(!cli.verbose);
        assert!(matches!(cli.command, Commands::Config { write: None }));
    }

    #[test]
    fn test_cli_config_write() {
        let cli =
            Cli::try_parse_from(["ndefence", "config", "--write", "/tmp/nd.yaml"]).unwrap();
        match cli.command {
            Commands::Config { write } => assert_eq!(write, Some(PathBuf::from("/tmp/nd.yaml"))),
            _ => panic!("Expected Config command"),
        }
    }
}
