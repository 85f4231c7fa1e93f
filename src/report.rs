//! Text report rendering.
//!
//! Four artifacts are produced each cycle: IP counts, whois dump, redirect
//! table and blocklist. Each starts with the same generated-on header and
//! falls back to a fixed placeholder line when it has nothing to list.

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

use crate::dns::{hostname_or_placeholder, HostnameResolver};
use crate::error::NdefenceError;
use crate::extractor::{AddressCounter, RedirectRecord};
use crate::policy::{BlockRendering, BlockSet};
use crate::validation::{format_fixed_width, sort_addresses};
use crate::whois::{CountryMap, WhoisEntry, UNKNOWN_COUNTRY};

/// Same layout as `date` prints by default
const HEADER_TIME_FORMAT: &str = "%a %b %e %H:%M:%S %Z %Y";

const SEPARATOR: &str = "-------------------------";
const WHOIS_SEPARATOR: &str = "---------------------";

/// Width of the count column in the IP report
const COUNT_WIDTH: usize = 7;

/// The report files written each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Artifact {
    IpCounts,
    Whois,
    Redirects,
    Blocklist,
}

impl Artifact {
    pub fn title(&self) -> &'static str {
        match self {
            Artifact::IpCounts => "IP Address Counts Data",
            Artifact::Whois => "Whois Entry Data",
            Artifact::Redirects => "Redirection Entry Data",
            Artifact::Blocklist => "Blocked Address Data",
        }
    }

    /// Line written when the artifact has nothing to list.
    pub fn placeholder(&self) -> &'static str {
        match self {
            Artifact::IpCounts => "No IP addresses listed at this time.",
            Artifact::Whois => "No whois entries given at this time.",
            Artifact::Redirects => "No redirections listed at this time.",
            Artifact::Blocklist => "No IPs blocked at this time.",
        }
    }
}

/// "Generated on / Log Data for" block shared by every artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportHeader {
    pub generated_on: String,
    pub reference_date: String,
}

impl ReportHeader {
    pub fn new<Tz>(now: &DateTime<Tz>, reference_date: &str) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        Self {
            generated_on: now.format(HEADER_TIME_FORMAT).to_string(),
            reference_date: reference_date.to_string(),
        }
    }

    pub fn render(&self) -> String {
        format!(
            "Generated on: {}\n\nLog Data for {}\n{}\n\n",
            self.generated_on, self.reference_date, SEPARATOR
        )
    }

    /// Header as `#` comments, so a blocklist stays machine-readable.
    pub fn render_commented(&self) -> String {
        format!(
            "# Generated on: {}\n# Log Data for {}\n\n",
            self.generated_on, self.reference_date
        )
    }
}

/// Assemble a full artifact from its header and body.
///
/// An empty body is replaced with the artifact's placeholder line.
pub fn compose(artifact: Artifact, header: &ReportHeader, body: &str) -> String {
    let body = if body.is_empty() {
        artifact.placeholder()
    } else {
        body
    };

    match artifact {
        Artifact::Blocklist => format!("{}{}", header.render_commented(), body),
        _ => format!("{}\n\n{}{}", artifact.title(), header.render(), body),
    }
}

/// `count | address | country | hostname` lines in sort-key order.
///
/// Both maps must be non-empty; an empty counter or country map is an
/// input error rather than an empty report.
pub fn render_ip_counts(
    counter: &AddressCounter,
    countries: &CountryMap,
    hostnames: &dyn HostnameResolver,
) -> Result<String, NdefenceError> {
    if counter.is_empty() {
        return Err(NdefenceError::InputValidation(
            "address counter is empty".to_string(),
        ));
    }
    if countries.is_empty() {
        return Err(NdefenceError::InputValidation(
            "country map is empty; check that a whois client is installed \
             and the network is reachable"
                .to_string(),
        ));
    }

    let mut out = String::new();
    for ip in sort_addresses(counter.addresses()) {
        let Ok(padded) = format_fixed_width(&ip) else {
            continue;
        };
        let country = countries
            .get(&ip)
            .filter(|c| c.len() == 2)
            .unwrap_or(UNKNOWN_COUNTRY);
        let hostname = hostname_or_placeholder(hostnames, &ip);

        out.push_str(&format!(
            "{:<width$} | {} | {} | {}\n",
            counter.get(&ip),
            padded,
            country,
            hostname,
            width = COUNT_WIDTH
        ));
    }

    Ok(out)
}

/// Whois blocks, one per resolved address.
pub fn render_whois(entries: &[WhoisEntry]) -> String {
    let mut out = String::new();
    for entry in entries {
        out.push_str("Whois Entry for the following: ");
        out.push_str(&entry.address);
        out.push('\n');
        match &entry.text {
            Some(text) => {
                out.push_str(text);
                out.push_str("\n\n");
            }
            None => out.push_str("N/A\n\n"),
        }
        out.push_str(WHOIS_SEPARATOR);
        out.push_str("\n\n");
    }

    // Placeholder entries alone still count as no whois data
    if !out.is_empty() && entries.iter().all(|entry| entry.text.is_none()) {
        out.push_str(Artifact::Whois.placeholder());
    }
    out
}

/// `address | status | target` lines in order of appearance.
pub fn render_redirects(records: &[RedirectRecord]) -> String {
    records
        .iter()
        .filter_map(|record| {
            format_fixed_width(&record.address)
                .ok()
                .map(|padded| format!("{} | {} | {}\n", padded, record.status, record.target))
        })
        .collect()
}

/// Bare newline-separated blocklist.
pub fn render_blocklist(blocked: &BlockSet) -> String {
    BlockRendering::Plain.render(blocked.iter())
}
