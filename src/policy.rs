//! Blocking policy: turns per-address counts, country codes and redirect
//! evidence into the set of addresses to block.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::extractor::AddressCounter;
use crate::validation::sort_addresses;
use crate::whois::CountryMap;

/// Countries whose traffic is never blocked on volume alone
pub const DEFAULT_ALLOWED_COUNTRIES: &[&str] = &["US", "CA", "UK", "FR", "DE", "NL"];

/// Minimum daily hit count before a non-allowed country is blocked
pub const DEFAULT_THRESHOLD: usize = 5;

/// Insertion-ordered set of addresses.
///
/// Membership is O(1); iteration follows the order addresses were first
/// inserted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BlockSet {
    order: Vec<String>,
    members: HashSet<String>,
}

impl BlockSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an address, returning `false` if it was already present.
    pub fn insert(&mut self, ip: &str) -> bool {
        if self.members.contains(ip) {
            return false;
        }
        self.members.insert(ip.to_string());
        self.order.push(ip.to_string());
        true
    }

    pub fn contains(&self, ip: &str) -> bool {
        self.members.contains(ip)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}

impl<'a> FromIterator<&'a str> for BlockSet {
    fn from_iter<I: IntoIterator<Item = &'a str>>(iter: I) -> Self {
        let mut set = BlockSet::new();
        for ip in iter {
            set.insert(ip);
        }
        set
    }
}

/// Country/volume policy settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BlockPolicy {
    /// Two-letter codes exempt from volume blocking
    pub allowed_countries: Vec<String>,
    /// Hit count at which an address from any other country is blocked
    pub threshold: usize,
}

impl Default for BlockPolicy {
    fn default() -> Self {
        Self {
            allowed_countries: DEFAULT_ALLOWED_COUNTRIES
                .iter()
                .map(|c| c.to_string())
                .collect(),
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl BlockPolicy {
    fn is_allowed(&self, code: &str) -> bool {
        self.allowed_countries
            .iter()
            .any(|allowed| allowed.eq_ignore_ascii_case(code))
    }

    /// Check the country/volume signal for one address.
    ///
    /// Unresolved addresses and codes that are not exactly two characters
    /// never qualify. The `--` sentinel is a recorded code and does.
    pub fn flags(&self, code: Option<&str>, count: usize) -> bool {
        let Some(code) = code else {
            return false;
        };
        if code.chars().count() != 2 || code == ".." {
            return false;
        }
        !self.is_allowed(code) && count >= self.threshold
    }

    /// Build the final block set.
    ///
    /// Redirect candidates come first in first-seen order, then every
    /// address flagged by [`BlockPolicy::flags`] in sort-key order.
    pub fn decide(
        &self,
        counter: &AddressCounter,
        countries: &CountryMap,
        redirect_candidates: &BlockSet,
    ) -> BlockSet {
        let mut blocked = redirect_candidates.clone();

        for ip in sort_addresses(counter.addresses()) {
            let count = counter.get(&ip);
            if self.flags(countries.get(&ip), count) {
                blocked.insert(&ip);
            }
        }

        blocked
    }
}

/// How the block set is written for the downstream enforcer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockRendering {
    /// One address per line
    Plain,
    /// `deny <ip>;` directives for an nginx include
    NginxDeny,
    /// `Require not ip` directives inside a `<RequireAll>` block
    ApacheDeny,
}

impl BlockRendering {
    /// Deny-rule syntax for the given server type.
    pub fn deny_for(server_type: &str) -> Self {
        match server_type {
            "apache" => BlockRendering::ApacheDeny,
            "nginx" => BlockRendering::NginxDeny,
            _ => BlockRendering::Plain,
        }
    }

    /// Render addresses. An empty iterator gives an empty body for the
    /// plain form and a rule block that denies nothing for the others.
    pub fn render<'a, I>(&self, addresses: I) -> String
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut out = String::new();
        match self {
            BlockRendering::Plain => {
                for ip in addresses {
                    out.push_str(ip);
                    out.push('\n');
                }
            }
            BlockRendering::NginxDeny => {
                out.push_str("# Generated by ndefence, do not edit\n");
                for ip in addresses {
                    out.push_str(&format!("deny {};\n", ip));
                }
            }
            BlockRendering::ApacheDeny => {
                out.push_str("# Generated by ndefence, do not edit\n");
                out.push_str("<RequireAll>\n");
                out.push_str("    Require all granted\n");
                for ip in addresses {
                    out.push_str(&format!("    Require not ip {}\n", ip));
                }
                out.push_str("</RequireAll>\n");
            }
        }
        out
    }
}
