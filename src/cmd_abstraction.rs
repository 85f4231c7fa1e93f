//! Command execution abstraction for testability.
//!
//! The whois lookup and the web-server reload are both external processes.
//! Routing them through a trait lets unit tests script their output and
//! exit status without a whois client or a running web server.

use anyhow::{Context, Result};
use std::process::{Command, Stdio};

#[cfg(test)]
use mockall::automock;

/// Output from command execution
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    /// Standard output from the command
    pub stdout: String,
    /// Standard error from the command
    pub stderr: String,
    /// Whether the command succeeded (exit code 0)
    pub success: bool,
    /// The exit code, if available
    pub code: Option<i32>,
}

impl CommandOutput {
    /// Stdout followed by stderr, the way a shell capturing `2>&1` into a
    /// single buffer would see it once the process has finished.
    pub fn combined(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }
}

/// Trait for command execution, allowing dependency injection for testing.
#[cfg_attr(test, automock)]
pub trait CommandExecutor: Send + Sync {
    /// Execute a command with the given arguments.
    ///
    /// # Arguments
    /// * `cmd` - The command to execute (e.g., "whois")
    /// * `args` - The arguments to pass to the command
    ///
    /// # Returns
    /// A `CommandOutput` with stdout, stderr and exit status. An `Err` means
    /// the process could not be spawned at all.
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput>;
}

/// Real implementation of CommandExecutor that runs actual system commands.
#[derive(Debug, Clone, Default)]
pub struct RealCommandExecutor;

impl RealCommandExecutor {
    /// Create a new RealCommandExecutor
    pub fn new() -> Self {
        Self
    }
}

impl CommandExecutor for RealCommandExecutor {
    fn execute(&self, cmd: &str, args: &[String]) -> Result<CommandOutput> {
        let output = Command::new(cmd)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .with_context(|| format!("Failed to execute {}", cmd))?;

        Ok(CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            success: output.status.success(),
            code: output.status.code(),
        })
    }
}

/// Helper function to convert a slice of &str to Vec<String>.
///
/// mockall has issues with lifetimes in `&[&str]`, so the trait takes
/// `&[String]` instead.
pub fn args_to_strings(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}
