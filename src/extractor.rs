//! Per-address activity and redirect extraction.

use regex::Regex;
use std::collections::HashMap;
use tracing::debug;

use crate::log_window::LogWindow;
use crate::policy::BlockSet;
use crate::validation::is_valid_ipv4;

/// Quote, a 302 status, the byte count, then a quoted field of 2-64 chars.
const REDIRECT_PATTERN: &str = r#"" 302 [0-9]{1,15} "(.{2,64})" "#;

/// Status code a redirect record must carry
const FOUND_STATUS: &str = "302";

/// Hit counts per address for the current window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressCounter {
    counts: HashMap<String, usize>,
}

impl AddressCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment(&mut self, ip: &str) {
        *self.counts.entry(ip.to_string()).or_insert(0) += 1;
    }

    /// Count for an address, zero if it was never seen.
    pub fn get(&self, ip: &str) -> usize {
        self.counts.get(ip).copied().unwrap_or(0)
    }

    /// Addresses in no particular order; see
    /// [`sort_addresses`](crate::validation::sort_addresses).
    pub fn addresses(&self) -> impl Iterator<Item = &String> {
        self.counts.keys()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Sum of all hits.
    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }
}

/// A 302 response observed for an address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectRecord {
    pub address: String,
    pub status: String,
    pub target: String,
}

/// Everything pulled out of one log window.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub counter: AddressCounter,
    /// Redirects in order of appearance
    pub redirects: Vec<RedirectRecord>,
    /// Addresses with at least one redirect, first-seen order
    pub candidates: BlockSet,
    /// Window lines dropped because field 0 was not an IPv4 address
    pub skipped_lines: usize,
}

/// Scans window lines for client addresses and 302 redirects.
#[derive(Debug, Clone)]
pub struct RedirectExtractor {
    redirect_regex: Regex,
}

impl RedirectExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            redirect_regex: Regex::new(REDIRECT_PATTERN)?,
        })
    }

    /// Find the redirect status and target in a single line, if any.
    pub fn find_redirect(&self, line: &str) -> Option<(String, String)> {
        let chunk = self.redirect_regex.find(line)?.as_str();

        let pieces: Vec<&str> = chunk.split(' ').collect();
        if pieces.len() < 4 {
            return None;
        }

        let status = pieces[1];
        if status != FOUND_STATUS {
            return None;
        }

        let target = pieces[3].trim_matches('"');
        if target.is_empty() {
            return None;
        }

        Some((status.to_string(), target.to_string()))
    }

    /// Count addresses and collect redirects over the whole window.
    pub fn extract(&self, window: &LogWindow<'_>) -> Extraction {
        let mut extraction = Extraction::default();

        for line in window.lines() {
            let ip = line.split(' ').next().unwrap_or_default();
            if !is_valid_ipv4(ip) {
                debug!("Skipping line without a client address: {:?}", line);
                extraction.skipped_lines += 1;
                continue;
            }

            extraction.counter.increment(ip);

            if let Some((status, target)) = self.find_redirect(line) {
                extraction.redirects.push(RedirectRecord {
                    address: ip.to_string(),
                    status,
                    target,
                });
                extraction.candidates.insert(ip);
            }
        }

        extraction
    }
}
