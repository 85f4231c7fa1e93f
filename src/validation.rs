//! Centralized validation functions for ndefence.
//!
//! This module provides unified validation for:
//! - IPv4 addresses as they appear in access logs
//! - Fixed-width address formatting for aligned reports
//! - Sort-key padding for ordering dotted-quad strings
//! - Time intervals, server types and country codes from the config file

use anyhow::{bail, Result};
use std::time::Duration;

use crate::error::NdefenceError;

/// Valid server types; each has its own log directory and deny-rule syntax
pub const VALID_SERVER_TYPES: &[&str] = &["nginx", "apache"];

/// Width every address is padded to in the text reports
pub const FIXED_WIDTH: usize = 16;

/// Check whether a string is a dotted-quad IPv4 address.
///
/// Length must be 8 to 15 characters, with exactly four non-empty decimal
/// pieces, each no greater than 255. Leading zeros are accepted.
///
/// # Examples
/// ```
/// use ndefence::validation::is_valid_ipv4;
/// assert!(is_valid_ipv4("192.168.1.1"));
/// assert!(!is_valid_ipv4("192.168.1"));
/// assert!(!is_valid_ipv4("192.168.1.256"));
/// ```
pub fn is_valid_ipv4(ip: &str) -> bool {
    // Eight characters minimum, so quads like 8.8.8.8 are rejected
    if ip.len() < 8 || ip.len() > 15 {
        return false;
    }

    let pieces: Vec<&str> = ip.split('.').collect();
    if pieces.len() != 4 {
        return false;
    }

    pieces.iter().all(|oct| {
        !oct.is_empty()
            && oct.bytes().all(|b| b.is_ascii_digit())
            && oct.parse::<u32>().map(|n| n <= 255).unwrap_or(false)
    })
}

/// Pad an IPv4 address with spaces to exactly [`FIXED_WIDTH`] characters.
///
/// Spaces are used rather than tabs since tabs get mangled by a lot of
/// log viewers.
///
/// # Examples
/// ```
/// use ndefence::validation::format_fixed_width;
/// assert_eq!(format_fixed_width("10.0.0.1").unwrap(), "10.0.0.1        ");
/// assert!(format_fixed_width("not-an-ip").is_err());
/// ```
pub fn format_fixed_width(ip: &str) -> Result<String, NdefenceError> {
    if ip.is_empty() || ip.len() > 15 || !is_valid_ipv4(ip) {
        return Err(NdefenceError::InvalidAddress(ip.to_string()));
    }
    Ok(format!("{:<width$}", ip, width = FIXED_WIDTH))
}

/// Build the lexical sort key of an address.
///
/// The first group is left-padded with zeros to three characters, based
/// on its length in the original string. This is a heuristic: it fixes
/// the ordering of the first octet only, later octets still sort
/// lexically, so it is not a true numeric IP ordering.
///
/// # Examples
/// ```
/// use ndefence::validation::sort_key;
/// assert_eq!(sort_key("1.2.3.4"), "001.2.3.4");
/// assert_eq!(sort_key("10.2.3.4"), "010.2.3.4");
/// assert_eq!(sort_key("100.2.3.4"), "100.2.3.4");
/// ```
pub fn sort_key(ip: &str) -> String {
    match ip.find('.') {
        Some(1) => format!("00{}", ip),
        Some(2) => format!("0{}", ip),
        _ => ip.to_string(),
    }
}

/// Sort addresses by their [`sort_key`], returning the original strings.
///
/// The padded keys are only used for comparison, so the padding never
/// needs to be stripped back off.
pub fn sort_addresses<'a, I>(addresses: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a String>,
{
    let mut sorted: Vec<String> = addresses.into_iter().cloned().collect();
    sorted.sort_by_cached_key(|ip| sort_key(ip));
    sorted
}

/// Validate an address for use outside the log parser (CLI, persisted
/// blocklist).
pub fn validate_ipv4(ip: &str) -> Result<(), NdefenceError> {
    if is_valid_ipv4(ip) {
        Ok(())
    } else {
        Err(NdefenceError::InvalidAddress(ip.to_string()))
    }
}

/// Parse an interval such as `30s`, `5m`, `12h` or `1d` into a duration.
///
/// # Examples
/// ```
/// use ndefence::validation::parse_interval;
/// use std::time::Duration;
/// assert_eq!(parse_interval("2h").unwrap(), Duration::from_secs(7200));
/// assert!(parse_interval("h").is_err());
/// ```
pub fn parse_interval(interval: &str) -> Result<Duration> {
    if interval.is_empty() {
        bail!("Interval cannot be empty");
    }

    // Reject non-ASCII to prevent Unicode edge cases with byte slicing
    if !interval.is_ascii() {
        bail!(
            "Invalid interval '{}'. Only ASCII characters allowed",
            interval
        );
    }

    if interval.len() < 2 {
        bail!(
            "Invalid interval '{}'. Use format like '12h', '30m', '1d'",
            interval
        );
    }

    let (num_part, suffix) = interval.split_at(interval.len() - 1);
    let multiplier: u64 = match suffix {
        "s" => 1,
        "m" => 60,
        "h" => 3600,
        "d" => 86_400,
        _ => bail!(
            "Invalid interval '{}'. Suffix must be s, m, h, or d",
            interval
        ),
    };

    let value: u32 = match num_part.parse() {
        Ok(v) if num_part.bytes().all(|b| b.is_ascii_digit()) => v,
        _ => bail!(
            "Invalid interval '{}'. Number part must be a positive integer",
            interval
        ),
    };

    if value == 0 {
        bail!("Invalid interval '{}'. Must be greater than zero", interval);
    }

    Ok(Duration::from_secs(u64::from(value) * multiplier))
}

/// Validate server type value.
///
/// # Examples
/// ```
/// use ndefence::validation::validate_server_type;
/// assert!(validate_server_type("nginx").is_ok());
/// assert!(validate_server_type("iis").is_err());
/// ```
pub fn validate_server_type(server_type: &str) -> Result<()> {
    if !VALID_SERVER_TYPES.contains(&server_type) {
        bail!(
            "Invalid server type '{}'. Valid values: {}",
            server_type,
            VALID_SERVER_TYPES.join(", ")
        );
    }
    Ok(())
}

/// Check that a country code is exactly two ASCII letters.
pub fn is_country_code(code: &str) -> bool {
    code.len() == 2 && code.bytes().all(|b| b.is_ascii_alphabetic())
}
