//! Reverse DNS resolution for the IP-count report.

use std::net::IpAddr;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;
use tracing::debug;

#[cfg(test)]
use mockall::automock;

/// Placeholder shown when an address has no usable PTR record
pub const NO_HOSTNAME: &str = "N/A";

/// Default reverse DNS timeout in seconds
const DNS_TIMEOUT_SECS: u64 = 5;

/// Best-effort reverse lookup of an address.
#[cfg_attr(test, automock)]
pub trait HostnameResolver: Send + Sync {
    /// First hostname for the address, `None` on any failure.
    fn lookup(&self, ip: &str) -> Option<String>;
}

/// Resolver backed by the system resolver (PTR records).
///
/// Each lookup runs on its own thread; a query that outlives `timeout` is
/// abandoned and reported as no hostname.
#[derive(Debug, Clone, Copy)]
pub struct SystemHostnameResolver {
    timeout: Duration,
}

impl SystemHostnameResolver {
    pub fn with_timeout(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for SystemHostnameResolver {
    fn default() -> Self {
        Self::with_timeout(Duration::from_secs(DNS_TIMEOUT_SECS))
    }
}

impl HostnameResolver for SystemHostnameResolver {
    fn lookup(&self, ip: &str) -> Option<String> {
        let addr: IpAddr = ip.parse().ok()?;
        bounded_lookup(self.timeout, move || dns_lookup::lookup_addr(&addr).ok())
            .filter(|hostname| !hostname.is_empty())
    }
}

/// Run a blocking lookup, giving up after `timeout`.
fn bounded_lookup<F>(timeout: Duration, lookup: F) -> Option<String>
where
    F: FnOnce() -> Option<String> + Send + 'static,
{
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        // The receiver is gone once the caller timed out
        let _ = tx.send(lookup());
    });

    match rx.recv_timeout(timeout) {
        Ok(hostname) => hostname,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            debug!("Reverse DNS timed out after {:?}", timeout);
            None
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => None,
    }
}

/// Resolver used when hostname lookups are switched off.
#[derive(Debug, Clone, Copy, Default)]
pub struct DisabledHostnameResolver;

impl HostnameResolver for DisabledHostnameResolver {
    fn lookup(&self, _ip: &str) -> Option<String> {
        None
    }
}

/// Hostname for display, never failing.
pub fn hostname_or_placeholder(resolver: &dyn HostnameResolver, ip: &str) -> String {
    resolver
        .lookup(ip)
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| NO_HOSTNAME.to_string())
}
