//! Run command implementation: one cycle, or the daemon loop.

use anyhow::Result;
use chrono::Local;
use tracing::info;

use crate::cmd_abstraction::RealCommandExecutor;
use crate::config::Config;
use crate::dns::{DisabledHostnameResolver, HostnameResolver, SystemHostnameResolver};
use crate::fs_abstraction::real_fs;
use crate::lock::LockGuard;
use crate::pipeline::{CycleSummary, Pipeline};
use crate::signal::{wait_for_interval, ShutdownGuard, ShutdownToken};

/// Run the analysis once, or forever at the configured interval.
///
/// A failing cycle ends the run in both modes.
pub async fn run(daemon: bool, json: bool, config: &Config) -> Result<()> {
    let _lock = LockGuard::acquire(&config.lock_file)?;

    let executor = RealCommandExecutor::new();
    let system_resolver = SystemHostnameResolver::default();
    let hostnames: &dyn HostnameResolver = if config.resolve_hostnames {
        &system_resolver
    } else {
        &DisabledHostnameResolver
    };
    let pipeline = Pipeline::new(config, real_fs(), &executor, hostnames)?;

    info!(
        "Analysing {} ({})",
        config.access_log_path().display(),
        config.server_type
    );

    if !daemon {
        let summary = pipeline.run_cycle(Local::now())?;
        report(&summary, json)?;
        return Ok(());
    }

    let interval = config.interval_duration()?;
    let _guard = ShutdownGuard::new();
    let token = ShutdownToken::new();
    info!("Daemon mode: one cycle every {}", config.interval);

    loop {
        let summary = pipeline.run_cycle(Local::now())?;
        report(&summary, json)?;

        if !wait_for_interval(interval, &token).await {
            info!("Shutdown requested, exiting");
            break;
        }
    }

    Ok(())
}

fn report(summary: &CycleSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string(summary)?);
    } else {
        info!(
            "{}: {} lines, {} requests, {} addresses, {} redirects, {} blocked",
            summary.reference_date,
            summary.lines_in_window,
            summary.requests,
            summary.addresses,
            summary.redirects,
            summary.blocked
        );
    }
    Ok(())
}
