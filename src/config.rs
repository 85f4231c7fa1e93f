//! Configuration management for ndefence.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::policy::BlockPolicy;
use crate::validation::{is_country_code, parse_interval, validate_server_type};

/// Default location of the configuration file
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ndefence/config.yaml";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Web server flavour (nginx, apache)
    pub server_type: String,

    /// Directory holding one log directory per server type
    pub log_directory: PathBuf,

    /// Access log file name inside `<log_directory>/<server_type>/`
    pub access_log: String,

    /// Explicit access log path, overriding the two fields above
    pub access_log_path: Option<PathBuf>,

    /// Directory the report artifacts are written to
    pub web_location: PathBuf,

    /// Artifact file names
    pub artifacts: ArtifactNames,

    /// Time between cycles in daemon mode
    pub interval: String,

    /// Whois client binary
    pub whois_command: String,

    /// Reverse DNS for the IP-count report
    pub resolve_hostnames: bool,

    /// Country/volume blocking policy
    pub policy: BlockPolicy,

    /// Deny-rule fragment written for the web server, if any
    pub deny_rules: Option<PathBuf>,

    /// Reload the web server after writing `deny_rules`
    pub reload_after_update: bool,

    /// Cross-cycle blocklist with expiry
    pub persistence: PersistenceConfig,

    /// Single-instance lock for daemon runs
    pub lock_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server_type: "nginx".to_string(),
            log_directory: PathBuf::from("/var/log/"),
            access_log: "access.log".to_string(),
            access_log_path: None,
            web_location: PathBuf::from("/var/www/html/data/"),
            artifacts: ArtifactNames::default(),
            interval: "12h".to_string(),
            whois_command: "whois".to_string(),
            resolve_hostnames: true,
            policy: BlockPolicy::default(),
            deny_rules: None,
            reload_after_update: false,
            persistence: PersistenceConfig::default(),
            lock_file: PathBuf::from("/var/run/ndefence.lock"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArtifactNames {
    pub ip_counts: String,
    pub whois: String,
    pub redirects: String,
    pub blocklist: String,
}

impl Default for ArtifactNames {
    fn default() -> Self {
        Self {
            ip_counts: "ip.log".to_string(),
            whois: "whois.log".to_string(),
            redirects: "redirect.log".to_string(),
            blocklist: "blocked.log".to_string(),
        }
    }
}

impl ArtifactNames {
    fn all(&self) -> [(&'static str, &str); 4] {
        [
            ("ip_counts", self.ip_counts.as_str()),
            ("whois", self.whois.as_str()),
            ("redirects", self.redirects.as_str()),
            ("blocklist", self.blocklist.as_str()),
        ]
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PersistenceConfig {
    pub enabled: bool,
    pub path: PathBuf,
    /// Hours after which a non-perma entry is dropped
    pub expiry_hours: u32,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            path: PathBuf::from("/var/lib/ndefence/blocked.list"),
            expiry_hours: 48,
        }
    }
}

impl PersistenceConfig {
    pub fn expiry(&self) -> chrono::Duration {
        chrono::Duration::hours(i64::from(self.expiry_hours))
    }
}

impl Config {
    /// Load configuration from YAML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {:?}", path.as_ref()))?;
        let config: Config = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path.as_ref()))?;

        config.validate()?;

        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        if path.as_ref().exists() {
            Self::load(path)
        } else {
            tracing::debug!(
                "No config file at {:?}, using defaults",
                path.as_ref()
            );
            Ok(Self::default())
        }
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        validate_server_type(&self.server_type)?;

        parse_interval(&self.interval).with_context(|| {
            format!(
                "Invalid interval '{}'. Use format like '12h', '30m', '1d'",
                self.interval
            )
        })?;

        for code in &self.policy.allowed_countries {
            if !is_country_code(code) {
                anyhow::bail!(
                    "Invalid allowed country '{}'. Use two-letter codes like 'US'",
                    code
                );
            }
        }

        for (field, name) in self.artifacts.all() {
            if name.trim().is_empty() {
                anyhow::bail!("Artifact name '{}' cannot be empty", field);
            }
            if name.contains('/') {
                anyhow::bail!(
                    "Artifact name '{}' must be a file name, not a path: {}",
                    field,
                    name
                );
            }
        }

        if self.whois_command.trim().is_empty() {
            anyhow::bail!("whois_command cannot be empty");
        }

        if self.persistence.enabled && self.persistence.expiry_hours == 0 {
            anyhow::bail!("persistence.expiry_hours must be greater than zero");
        }

        Ok(())
    }

    /// Save configuration to YAML file atomically
    ///
    /// Uses tempfile + rename pattern to prevent corruption on crash.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let path = path.as_ref();
        let content = serde_yaml::to_string(self).with_context(|| "Failed to serialize config")?;

        // Create temporary file in the same directory for atomic rename
        let parent_dir = path.parent().unwrap_or(Path::new("/etc/ndefence"));
        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for config")?;

        temp_file.write_all(content.as_bytes())?;
        temp_file.as_file().sync_all()?;

        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist config file: {:?}", path))?;

        Ok(())
    }

    /// Path of the access log to analyse.
    pub fn access_log_path(&self) -> PathBuf {
        match &self.access_log_path {
            Some(path) => path.clone(),
            None => self
                .log_directory
                .join(&self.server_type)
                .join(&self.access_log),
        }
    }

    /// Paths of the four report artifacts, in write order.
    pub fn artifact_paths(&self) -> ArtifactPaths {
        ArtifactPaths {
            ip_counts: self.web_location.join(&self.artifacts.ip_counts),
            whois: self.web_location.join(&self.artifacts.whois),
            redirects: self.web_location.join(&self.artifacts.redirects),
            blocklist: self.web_location.join(&self.artifacts.blocklist),
        }
    }

    /// Daemon interval; only valid after [`Config::validate`].
    pub fn interval_duration(&self) -> Result<Duration> {
        parse_interval(&self.interval)
    }
}

/// Resolved artifact locations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    pub ip_counts: PathBuf,
    pub whois: PathBuf,
    pub redirects: PathBuf,
    pub blocklist: PathBuf,
}
