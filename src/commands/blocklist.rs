//! Blocklist command implementation for the persisted store.

use anyhow::Result;
use chrono::{DateTime, Utc};
use tracing::warn;

use crate::cli::BlocklistAction;
use crate::config::Config;
use crate::fs_abstraction::real_fs;
use crate::lock::LockGuard;
use crate::persist::{BlocklistStore, Stamp};

/// Run the blocklist command
pub async fn run(action: BlocklistAction, config: &Config) -> Result<()> {
    if !config.persistence.enabled {
        warn!("Persistence is disabled in the config; showing the file anyway");
    }

    let path = &config.persistence.path;
    let now = Utc::now();

    match action {
        BlocklistAction::Show => {
            let store = BlocklistStore::load(real_fs(), path)?;
            if store.is_empty() {
                println!("No persisted entries in {}", path.display());
            }
            for line in show_lines(&store, now) {
                println!("{}", line);
            }
        }
        BlocklistAction::Prune => {
            let _lock = LockGuard::acquire(&config.lock_file)?;
            let mut store = BlocklistStore::load(real_fs(), path)?;
            let removed = store.prune(now, config.persistence.expiry());
            store.save(path)?;
            println!(
                "[OK] Removed {} expired entries, {} remaining",
                removed,
                store.len()
            );
        }
    }

    Ok(())
}

/// One line per entry with its age.
fn show_lines(store: &BlocklistStore, now: DateTime<Utc>) -> Vec<String> {
    store
        .entries()
        .iter()
        .map(|entry| match entry.stamp {
            Stamp::Perma => format!("{:<16} perma", entry.address),
            Stamp::Seen(t) => format!(
                "{:<16} {} ({}h ago)",
                entry.address,
                t.to_rfc3339(),
                now.signed_duration_since(t).num_hours()
            ),
        })
        .collect()
}
