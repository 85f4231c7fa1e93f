//! Persisted blocklist carried across cycles.
//!
//! One entry per line: `<ip> # <RFC3339 timestamp>` or `<ip> # perma`.
//! Blank lines and `#` comments are ignored, as are lines whose address or
//! stamp does not parse.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::fs_abstraction::FileSystem;
use crate::policy::BlockSet;
use crate::validation::is_valid_ipv4;

const PERMA: &str = "perma";

/// When an entry was last flagged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    Seen(DateTime<Utc>),
    /// Never expires
    Perma,
}

impl Stamp {
    fn parse(s: &str) -> Option<Self> {
        if s == PERMA {
            return Some(Stamp::Perma);
        }
        DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|t| Stamp::Seen(t.with_timezone(&Utc)))
    }

    fn render(&self) -> String {
        match self {
            Stamp::Seen(t) => t.to_rfc3339(),
            Stamp::Perma => PERMA.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistedEntry {
    pub address: String,
    pub stamp: Stamp,
}

/// Ordered, de-duplicated list of persisted entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlocklistStore {
    entries: Vec<PersistedEntry>,
}

impl BlocklistStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the on-disk format, dropping anything unusable.
    pub fn parse(content: &str) -> Self {
        let mut store = Self::new();

        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((address, stamp)) = line.split_once('#') else {
                debug!("Skipping persisted entry without a stamp: {:?}", line);
                continue;
            };
            let address = address.trim();
            if !is_valid_ipv4(address) {
                debug!("Skipping persisted entry with bad address: {:?}", line);
                continue;
            }
            let Some(stamp) = Stamp::parse(stamp.trim()) else {
                debug!("Skipping persisted entry with bad stamp: {:?}", line);
                continue;
            };

            store.upsert(address, stamp);
        }

        store
    }

    /// Load from disk; a missing file is an empty store.
    pub fn load(fs: &dyn FileSystem, path: &Path) -> Result<Self> {
        if !fs.exists(path) {
            return Ok(Self::new());
        }
        let content = fs
            .read_to_string(path)
            .with_context(|| format!("Failed to read persisted blocklist: {:?}", path))?;
        Ok(Self::parse(&content))
    }

    fn upsert(&mut self, address: &str, stamp: Stamp) {
        match self.entries.iter_mut().find(|e| e.address == address) {
            Some(existing) => {
                if existing.stamp != Stamp::Perma {
                    existing.stamp = stamp;
                }
            }
            None => self.entries.push(PersistedEntry {
                address: address.to_string(),
                stamp,
            }),
        }
    }

    /// Add this cycle's blocked addresses, refreshing existing stamps.
    /// Perma entries stay perma.
    pub fn merge(&mut self, blocked: &BlockSet, now: DateTime<Utc>) {
        for ip in blocked.iter() {
            self.upsert(ip, Stamp::Seen(now));
        }
    }

    /// Drop entries last seen more than `expiry` before `now`.
    /// Returns how many were removed.
    pub fn prune(&mut self, now: DateTime<Utc>, expiry: Duration) -> usize {
        let before = self.entries.len();
        self.entries.retain(|entry| match entry.stamp {
            Stamp::Perma => true,
            Stamp::Seen(t) => now.signed_duration_since(t) <= expiry,
        });
        before - self.entries.len()
    }

    pub fn entries(&self) -> &[PersistedEntry] {
        &self.entries
    }

    pub fn addresses(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.address.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn render(&self) -> String {
        self.entries
            .iter()
            .map(|e| format!("{} # {}\n", e.address, e.stamp.render()))
            .collect()
    }

    /// Write atomically via a temp file in the target directory.
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent_dir = path.parent().unwrap_or(Path::new("."));
        std::fs::create_dir_all(parent_dir)
            .with_context(|| format!("Failed to create directory: {:?}", parent_dir))?;

        let mut temp_file = NamedTempFile::new_in(parent_dir)
            .context("Failed to create temporary file for persisted blocklist")?;
        temp_file.write_all(self.render().as_bytes())?;
        temp_file.as_file().sync_all()?;
        temp_file
            .persist(path)
            .with_context(|| format!("Failed to persist blocklist: {:?}", path))?;

        Ok(())
    }
}
