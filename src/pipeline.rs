//! One analysis cycle, end to end.
//!
//! ```text
//! access log ─► window ─► counts + redirects ─► whois countries
//!                                                   │
//!            artifacts ◄── block set ◄── policy ◄───┘
//! ```
//!
//! All per-cycle state lives in a [`CycleContext`] that is dropped when
//! the cycle ends. Only the opt-in persisted blocklist outlives it.

use anyhow::{Context, Result};
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::cmd_abstraction::CommandExecutor;
use crate::config::Config;
use crate::dns::HostnameResolver;
use crate::error::NdefenceError;
use crate::extractor::{Extraction, RedirectExtractor};
use crate::fs_abstraction::FileSystem;
use crate::log_window::{tokenize_file, LogWindow};
use crate::persist::BlocklistStore;
use crate::policy::{BlockRendering, BlockSet};
use crate::reload::reload_server;
use crate::report::{
    compose, render_blocklist, render_ip_counts, render_redirects, render_whois, Artifact,
    ReportHeader,
};
use crate::whois::{RegistryCountryExtractor, WhoisOutcome, WhoisResolver};

/// Counts logged (and optionally printed) after each cycle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleSummary {
    pub reference_date: String,
    pub lines_in_window: usize,
    pub skipped_lines: usize,
    /// Hits attributed to a valid client address
    pub requests: usize,
    pub addresses: usize,
    pub redirects: usize,
    pub blocked: usize,
    pub resolved_countries: usize,
    /// Size of the persisted blocklist, when persistence is on
    #[serde(skip_serializing_if = "Option::is_none")]
    pub persisted: Option<usize>,
}

/// State built up by the stages of one cycle.
#[derive(Debug, Clone, Default)]
pub struct CycleContext {
    pub reference_date: String,
    pub lines_in_window: usize,
    pub extraction: Extraction,
    pub whois: WhoisOutcome,
    pub blocked: BlockSet,
    pub persisted: Option<usize>,
}

impl CycleContext {
    fn new(window: &LogWindow<'_>) -> Self {
        Self {
            reference_date: window.reference_date.clone(),
            lines_in_window: window.len(),
            ..Default::default()
        }
    }

    pub fn summary(&self) -> CycleSummary {
        CycleSummary {
            reference_date: self.reference_date.clone(),
            lines_in_window: self.lines_in_window,
            skipped_lines: self.extraction.skipped_lines,
            requests: self.extraction.counter.total(),
            addresses: self.extraction.counter.len(),
            redirects: self.extraction.redirects.len(),
            blocked: self.blocked.len(),
            resolved_countries: self.whois.countries.resolved(),
            persisted: self.persisted,
        }
    }
}

/// Runs cycles against one configuration and set of collaborators.
pub struct Pipeline<'a> {
    config: &'a Config,
    fs: &'a dyn FileSystem,
    executor: &'a dyn CommandExecutor,
    hostnames: &'a dyn HostnameResolver,
    extractor: RedirectExtractor,
    countries: RegistryCountryExtractor,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a Config,
        fs: &'a dyn FileSystem,
        executor: &'a dyn CommandExecutor,
        hostnames: &'a dyn HostnameResolver,
    ) -> Result<Self> {
        Ok(Self {
            config,
            fs,
            executor,
            hostnames,
            extractor: RedirectExtractor::new().context("Failed to compile redirect pattern")?,
            countries: RegistryCountryExtractor::new()
                .context("Failed to compile country pattern")?,
        })
    }

    /// Run one full cycle and write every artifact.
    ///
    /// Any error is fatal for the cycle; artifacts already written in this
    /// cycle are left as they are.
    pub fn run_cycle(&self, now: DateTime<Local>) -> Result<CycleSummary> {
        self.check_output_dir()?;

        let log_path = self.config.access_log_path();
        let lines = tokenize_file(self.fs, &log_path)?;
        let window = LogWindow::select(&lines)?;
        debug!(
            "Window {} holds {} of {} lines",
            window.reference_date,
            window.len(),
            lines.len()
        );

        let mut ctx = CycleContext::new(&window);
        ctx.extraction = self.extractor.extract(&window);

        self.resolve_countries(&mut ctx)?;
        ctx.blocked = self.config.policy.decide(
            &ctx.extraction.counter,
            &ctx.whois.countries,
            &ctx.extraction.candidates,
        );

        self.write_artifacts(&ctx, &now)?;
        self.update_deny_rules(&mut ctx, now.with_timezone(&Utc))?;

        let summary = ctx.summary();
        match serde_json::to_string(&summary) {
            Ok(json) => info!("Cycle complete: {}", json),
            Err(e) => warn!("Could not serialize cycle summary: {}", e),
        }
        Ok(summary)
    }

    fn check_output_dir(&self) -> Result<()> {
        let dir = &self.config.web_location;
        if !self.fs.is_dir(dir) {
            return Err(NdefenceError::FileSystem(format!(
                "output directory {} does not exist",
                dir.display()
            ))
            .into());
        }
        Ok(())
    }

    fn resolve_countries(&self, ctx: &mut CycleContext) -> Result<()> {
        let counter = &ctx.extraction.counter;
        if counter.is_empty() {
            info!("No client addresses in window {}", ctx.reference_date);
            return Ok(());
        }

        let resolver = WhoisResolver::new(
            self.executor,
            &self.config.whois_command,
            Box::new(self.countries.clone()),
        );
        ctx.whois = resolver.resolve_all(counter)?;

        if ctx.whois.countries.is_empty() {
            return Err(NdefenceError::ExternalProcess(format!(
                "no whois lookup succeeded for {} addresses; check that '{}' is \
                 installed and the network is reachable",
                counter.len(),
                self.config.whois_command
            ))
            .into());
        }

        info!(
            "Resolved {} of {} addresses to a country",
            ctx.whois.countries.resolved(),
            counter.len()
        );
        Ok(())
    }

    fn write_artifacts(&self, ctx: &CycleContext, now: &DateTime<Local>) -> Result<()> {
        let header = ReportHeader::new(now, &ctx.reference_date);
        let paths = self.config.artifact_paths();

        let ip_counts = if ctx.extraction.counter.is_empty() {
            String::new()
        } else {
            render_ip_counts(
                &ctx.extraction.counter,
                &ctx.whois.countries,
                self.hostnames,
            )?
        };

        let artifacts = [
            (Artifact::IpCounts, &paths.ip_counts, ip_counts),
            (Artifact::Whois, &paths.whois, render_whois(&ctx.whois.entries)),
            (
                Artifact::Redirects,
                &paths.redirects,
                render_redirects(&ctx.extraction.redirects),
            ),
            (Artifact::Blocklist, &paths.blocklist, render_blocklist(&ctx.blocked)),
        ];

        for (artifact, path, body) in artifacts {
            self.write_file(path, &compose(artifact, &header, &body))?;
            debug!("Wrote {}", path.display());
        }

        info!(
            "Wrote reports to {} ({} blocked)",
            self.config.web_location.display(),
            ctx.blocked.len()
        );
        Ok(())
    }

    fn write_file(&self, path: &Path, contents: &str) -> Result<()> {
        self.fs
            .create_if_absent(path)
            .and_then(|_| self.fs.write(path, contents.as_bytes()))
            .map_err(|e| {
                NdefenceError::FileSystem(format!("Unable to write {}: {}", path.display(), e))
            })?;
        Ok(())
    }

    /// Merge into the persisted store (when enabled), then write the
    /// deny-rule fragment and reload the server (when configured).
    fn update_deny_rules(&self, ctx: &mut CycleContext, now: DateTime<Utc>) -> Result<()> {
        let persistence = &self.config.persistence;

        let store = if persistence.enabled {
            let mut store = BlocklistStore::load(self.fs, &persistence.path)?;
            store.merge(&ctx.blocked, now);
            let expired = store.prune(now, persistence.expiry());
            if expired > 0 {
                info!("Expired {} persisted entries", expired);
            }
            store.save(&persistence.path)?;
            ctx.persisted = Some(store.len());
            Some(store)
        } else {
            None
        };

        let Some(deny_path) = &self.config.deny_rules else {
            return Ok(());
        };

        let rendering = BlockRendering::deny_for(&self.config.server_type);
        let fragment = match &store {
            Some(store) => rendering.render(store.addresses()),
            None => rendering.render(ctx.blocked.iter()),
        };
        self.write_file(deny_path, &fragment)?;
        info!("Updated deny rules at {}", deny_path.display());

        if self.config.reload_after_update {
            reload_server(self.executor, &self.config.server_type);
        }
        Ok(())
    }
}
