//! Whois lookups and the country-code heuristic.
//!
//! Whois output is free text with no common schema. Country extraction is
//! therefore a pluggable [`CountryExtractor`]; the default implementation
//! uses the `country:` line convention most regional registries follow,
//! plus per-registry overrides for the ones that do not.

use regex::Regex;
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::cmd_abstraction::CommandExecutor;
use crate::error::NdefenceError;
use crate::extractor::AddressCounter;
use crate::validation::{is_country_code, sort_addresses};

/// Country code used when whois gave text but no usable country
pub const UNKNOWN_COUNTRY: &str = "--";

/// Exit status whois uses when a referral failed after some output was
/// already printed
pub const SOFT_FAILURE_EXIT_CODE: i32 = 2;

/// Text some resolvers print in place of an empty record
const NIL_RECORD: &str = "<nil>";

const COUNTRY_LINE_PATTERN: &str = r"[cC]ountry:([^\n]{2,32})\n";

/// Address to two-letter country code (or [`UNKNOWN_COUNTRY`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CountryMap {
    codes: HashMap<String, String>,
}

impl CountryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, ip: &str, code: &str) {
        self.codes.insert(ip.to_string(), code.to_string());
    }

    pub fn get(&self, ip: &str) -> Option<&str> {
        self.codes.get(ip).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }

    /// Number of addresses resolved to a real country code.
    pub fn resolved(&self) -> usize {
        self.codes.values().filter(|c| is_country_code(c)).count()
    }
}

/// Strategy for pulling a country code out of raw whois text.
pub trait CountryExtractor: Send + Sync {
    /// Return an upper-case two-letter code, or [`UNKNOWN_COUNTRY`].
    fn extract(&self, text: &str) -> String;
}

/// Default extractor: `country:` lines with registry overrides.
#[derive(Debug, Clone)]
pub struct RegistryCountryExtractor {
    country_regex: Regex,
    /// (marker text, country code); first marker found in the text wins
    overrides: Vec<(String, String)>,
}

impl RegistryCountryExtractor {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            country_regex: Regex::new(COUNTRY_LINE_PATTERN)?,
            // registro.br output has no reliable country: line
            overrides: vec![("whois.registro.br".to_string(), "BR".to_string())],
        })
    }

    /// Add a registry whose output does not carry a usable `country:` line.
    pub fn with_override(mut self, marker: &str, code: &str) -> Self {
        self.overrides.push((marker.to_string(), code.to_uppercase()));
        self
    }

    /// Value of the `country:` line to use, before token checks.
    ///
    /// When there are two or more, the second wins: the first usually
    /// belongs to the RIR block that refers to the national registry.
    fn candidate<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.country_regex
            .captures_iter(text)
            .take(2)
            .filter_map(|caps| caps.get(1))
            .last()
            .map(|m| m.as_str())
    }
}

impl CountryExtractor for RegistryCountryExtractor {
    fn extract(&self, text: &str) -> String {
        let override_code = self
            .overrides
            .iter()
            .find(|(marker, _)| text.contains(marker.as_str()))
            .map(|(_, code)| code.as_str());

        let candidate = match override_code {
            Some(code) => code,
            None => self.candidate(text).map(str::trim).unwrap_or_default(),
        };

        if candidate.len() < 2 {
            return UNKNOWN_COUNTRY.to_string();
        }

        candidate
            .split_whitespace()
            .find(|token| is_country_code(token))
            .map(|token| token.to_ascii_uppercase())
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string())
    }
}

/// One block of the whois report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisEntry {
    pub address: String,
    /// Trimmed whois text, `None` when the lookup returned nothing
    pub text: Option<String>,
}

/// Result of resolving every address in a window.
#[derive(Debug, Clone, Default)]
pub struct WhoisOutcome {
    pub countries: CountryMap,
    /// Entries in address sort-key order
    pub entries: Vec<WhoisEntry>,
}

/// Outcome of a single whois invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WhoisLookup {
    /// Usable text (possibly partial)
    Record(String),
    /// The command ran but produced no record
    NoRecord,
    /// The command failed; the address is left out of the reports
    Failed,
}

/// Runs the whois collaborator one address at a time.
pub struct WhoisResolver<'a> {
    executor: &'a dyn CommandExecutor,
    command: String,
    extractor: Box<dyn CountryExtractor + 'a>,
}

impl<'a> WhoisResolver<'a> {
    pub fn new(
        executor: &'a dyn CommandExecutor,
        command: &str,
        extractor: Box<dyn CountryExtractor + 'a>,
    ) -> Self {
        Self {
            executor,
            command: command.to_string(),
            extractor,
        }
    }

    /// Run whois for a single address.
    pub fn lookup(&self, ip: &str) -> WhoisLookup {
        let output = match self.executor.execute(&self.command, &[ip.to_string()]) {
            Ok(output) => output,
            Err(e) => {
                warn!("whois lookup for {} could not run: {:#}", ip, e);
                return WhoisLookup::Failed;
            }
        };

        let raw = output.combined();

        if !output.success {
            let soft = output.code == Some(SOFT_FAILURE_EXIT_CODE) && !raw.is_empty();
            if !soft {
                debug!(
                    "whois lookup for {} failed with status {:?}, skipping",
                    ip, output.code
                );
                return WhoisLookup::Failed;
            }
            debug!("whois lookup for {} partially failed, using partial output", ip);
        }

        if raw.is_empty() || raw == NIL_RECORD {
            return WhoisLookup::NoRecord;
        }

        let trimmed = raw.trim_matches(' ');
        if trimmed.is_empty() {
            return WhoisLookup::NoRecord;
        }

        WhoisLookup::Record(trimmed.to_string())
    }

    /// Country code for a whois record.
    pub fn country_of(&self, text: &str) -> String {
        self.extractor.extract(text)
    }

    /// Resolve every address seen in the window, in sort-key order.
    pub fn resolve_all(&self, counter: &AddressCounter) -> Result<WhoisOutcome, NdefenceError> {
        if counter.is_empty() {
            return Err(NdefenceError::InputValidation(
                "no addresses to resolve".to_string(),
            ));
        }

        let mut outcome = WhoisOutcome::default();

        for ip in sort_addresses(counter.addresses()) {
            match self.lookup(&ip) {
                WhoisLookup::Record(text) => {
                    let code = self.country_of(&text);
                    debug!("{} resolved to {}", ip, code);
                    outcome.countries.insert(&ip, &code);
                    outcome.entries.push(WhoisEntry {
                        address: ip,
                        text: Some(text),
                    });
                }
                WhoisLookup::NoRecord => {
                    outcome.entries.push(WhoisEntry {
                        address: ip,
                        text: None,
                    });
                }
                WhoisLookup::Failed => {}
            }
        }

        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_abstraction::{CommandOutput, MockCommandExecutor};

    fn extractor() -> RegistryCountryExtractor {
        RegistryCountryExtractor::new().unwrap()
    }

    fn output(stdout: &str, code: i32) -> CommandOutput {
        CommandOutput {
            stdout: stdout.to_string(),
            stderr: String::new(),
            success: code == 0,
            code: Some(code),
        }
    }

    fn counter(ips: &[&str]) -> AddressCounter {
        let mut counter = AddressCounter::new();
        for ip in ips {
            counter.increment(ip);
        }
        counter
    }

    #[test]
    fn test_single_country_line() {
        let text = "inetnum: 10.0.0.0 - 10.0.0.255\ncountry:        RU\nsource: RIPE\n";
        assert_eq!(extractor().extract(text), "RU");
    }

    #[test]
    fn test_second_country_line_wins() {
        let text = "Country: NL\nnetname: REFERRAL\ncountry: DE\n";
        assert_eq!(extractor().extract(text), "DE");
    }

    #[test]
    fn test_third_country_line_ignored() {
        let text = "Country: NL\ncountry: DE\ncountry: FR\n";
        assert_eq!(extractor().extract(text), "DE");
    }

    #[test]
    fn test_lowercase_code_upcased() {
        assert_eq!(extractor().extract("country: jp\n"), "JP");
    }

    #[test]
    fn test_brazil_registry_override() {
        let text = "% Copyright (c) Nic.br\nrefer: whois.registro.br\ncountry: US\n";
        assert_eq!(extractor().extract(text), "BR");
    }

    #[test]
    fn test_custom_override() {
        let ext = extractor().with_override("whois.example-nic.kr", "kr");
        assert_eq!(ext.extract("source: whois.example-nic.kr\n"), "KR");
    }

    #[test]
    fn test_no_country_line() {
        assert_eq!(extractor().extract("NetRange: 8.8.8.0 - 8.8.8.255\n"), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_country_name_not_code() {
        assert_eq!(extractor().extract("Country: Germany\n"), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_code_after_other_tokens() {
        assert_eq!(extractor().extract("country: EU # world\n"), "EU");
        assert_eq!(extractor().extract("Country: Republic of KR\n"), "OF");
    }

    #[test]
    fn test_country_line_without_newline_ignored() {
        assert_eq!(extractor().extract("country: RU"), UNKNOWN_COUNTRY);
    }

    #[test]
    fn test_carriage_return_line_endings() {
        assert_eq!(extractor().extract("country:   CN\r\n"), "CN");
    }

    #[test]
    fn test_lookup_success() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .withf(|cmd, args| cmd == "whois" && args == ["10.0.0.5".to_string()])
            .returning(|_, _| Ok(output("  country: RU\n", 0)));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        assert_eq!(
            resolver.lookup("10.0.0.5"),
            WhoisLookup::Record("country: RU\n".to_string())
        );
    }

    #[test]
    fn test_lookup_soft_failure_with_output() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Ok(output("country: CN\n", SOFT_FAILURE_EXIT_CODE)));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        assert!(matches!(resolver.lookup("10.0.0.5"), WhoisLookup::Record(_)));
    }

    #[test]
    fn test_lookup_soft_failure_without_output() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Ok(output("", SOFT_FAILURE_EXIT_CODE)));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        assert_eq!(resolver.lookup("10.0.0.5"), WhoisLookup::Failed);
    }

    #[test]
    fn test_lookup_other_failure() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Ok(output("country: CN\n", 1)));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        assert_eq!(resolver.lookup("10.0.0.5"), WhoisLookup::Failed);
    }

    #[test]
    fn test_lookup_spawn_error() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Err(anyhow::anyhow!("No such file or directory")));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        assert_eq!(resolver.lookup("10.0.0.5"), WhoisLookup::Failed);
    }

    #[test]
    fn test_lookup_nil_and_blank() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .withf(|_, args| args[0] == "10.0.0.1")
            .returning(|_, _| Ok(output("<nil>", 0)));
        mock.expect_execute()
            .withf(|_, args| args[0] == "10.0.0.2")
            .returning(|_, _| Ok(output("    ", 0)));
        mock.expect_execute()
            .withf(|_, args| args[0] == "10.0.0.3")
            .returning(|_, _| Ok(output("", 0)));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        assert_eq!(resolver.lookup("10.0.0.1"), WhoisLookup::NoRecord);
        assert_eq!(resolver.lookup("10.0.0.2"), WhoisLookup::NoRecord);
        assert_eq!(resolver.lookup("10.0.0.3"), WhoisLookup::NoRecord);
    }

    #[test]
    fn test_resolve_all_empty_counter() {
        let mock = MockCommandExecutor::new();
        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        assert!(matches!(
            resolver.resolve_all(&AddressCounter::new()),
            Err(NdefenceError::InputValidation(_))
        ));
    }

    #[test]
    fn test_resolve_all_mixed_outcomes() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .withf(|_, args| args[0] == "10.0.0.5")
            .times(1)
            .returning(|_, _| Ok(output("country: RU\n", 0)));
        mock.expect_execute()
            .withf(|_, args| args[0] == "8.8.8.80")
            .times(1)
            .returning(|_, _| Ok(output("<nil>", 0)));
        mock.expect_execute()
            .withf(|_, args| args[0] == "192.168.1.2")
            .times(1)
            .returning(|_, _| Ok(output("", 1)));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        let outcome = resolver
            .resolve_all(&counter(&["10.0.0.5", "192.168.1.2", "8.8.8.80"]))
            .unwrap();

        assert_eq!(outcome.countries.get("10.0.0.5"), Some("RU"));
        assert_eq!(outcome.countries.get("8.8.8.80"), None);
        assert_eq!(outcome.countries.get("192.168.1.2"), None);
        assert_eq!(outcome.countries.resolved(), 1);

        let order: Vec<&str> = outcome.entries.iter().map(|e| e.address.as_str()).collect();
        assert_eq!(order, vec!["8.8.8.80", "10.0.0.5"]);
        assert_eq!(outcome.entries[0].text, None);
    }

    #[test]
    fn test_resolve_all_sentinel_recorded() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Ok(output("NetName: PRIVATE\n", 0)));

        let resolver = WhoisResolver::new(&mock, "whois", Box::new(extractor()));
        let outcome = resolver.resolve_all(&counter(&["10.0.0.5"])).unwrap();
        assert_eq!(outcome.countries.get("10.0.0.5"), Some(UNKNOWN_COUNTRY));
        assert_eq!(outcome.countries.resolved(), 0);
    }
}
