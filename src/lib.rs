//! # ndefence - adaptive blocklists from web server access logs
//!
//! Reads an nginx/apache access log, keeps the lines of the most recent
//! day, counts requests per client address, spots 302 redirects, looks
//! every address up in whois and decides which addresses to block.
//! The results land in four plain-text reports plus an optional deny-rule
//! fragment for the web server.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        ndefence                             │
//! ├─────────────────────────────────────────────────────────────┤
//! │  CLI (clap)                                                 │
//! │    └── Commands: run [--daemon], whois, blocklist, config   │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Config (serde_yaml)                                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Pipeline (one CycleContext per cycle)                      │
//! │    ├── LogWindow        newest day of the access log        │
//! │    ├── RedirectExtractor  counts + 302 redirects            │
//! │    ├── WhoisResolver    country heuristic (CommandExecutor) │
//! │    ├── BlockPolicy      redirects + country/volume          │
//! │    └── report           ip / whois / redirect / blocked     │
//! ├─────────────────────────────────────────────────────────────┤
//! │  Deny rules (nginx/apache) + reload, persisted blocklist    │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example Usage
//!
//! ```no_run
//! use chrono::Local;
//! use ndefence::cmd_abstraction::RealCommandExecutor;
//! use ndefence::config::Config;
//! use ndefence::dns::DisabledHostnameResolver;
//! use ndefence::fs_abstraction::real_fs;
//! use ndefence::pipeline::Pipeline;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = Config::load("/etc/ndefence/config.yaml")?;
//!     let executor = RealCommandExecutor::new();
//!
//!     let pipeline = Pipeline::new(&config, real_fs(), &executor, &DisabledHostnameResolver)?;
//!     let summary = pipeline.run_cycle(Local::now())?;
//!     println!("{} addresses blocked", summary.blocked);
//!     Ok(())
//! }
//! ```
//!
//! ## Modules
//!
//! - [`cli`] - Command-line interface definitions
//! - [`cmd_abstraction`] - External process seam (whois, service reload)
//! - [`commands`] - CLI command implementations
//! - [`config`] - Configuration parsing and validation
//! - [`dns`] - Reverse DNS for the IP report
//! - [`error`] - Domain error type
//! - [`extractor`] - Per-address counts and redirect records
//! - [`fs_abstraction`] - Filesystem seam
//! - [`lock`] - File locking for concurrent execution prevention
//! - [`log_window`] - Access log tokenizing and window selection
//! - [`persist`] - Persisted blocklist with expiry
//! - [`pipeline`] - One analysis cycle
//! - [`policy`] - Block decision and deny-rule rendering
//! - [`reload`] - Web server reload
//! - [`report`] - Report artifact rendering
//! - [`signal`] - Graceful shutdown signal handling
//! - [`validation`] - IPv4 checks, fixed-width formatting, sort keys
//! - [`whois`] - Whois lookups and the country heuristic

pub mod cli;
pub mod cmd_abstraction;
pub mod commands;
pub mod config;
pub mod dns;
pub mod error;
pub mod extractor;
pub mod fs_abstraction;
pub mod lock;
pub mod log_window;
pub mod persist;
pub mod pipeline;
pub mod policy;
pub mod reload;
pub mod report;
pub mod signal;
pub mod validation;
pub mod whois;

pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::NdefenceError;
