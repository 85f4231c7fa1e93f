//! Signal handling for graceful shutdown.
//!
//! SIGINT and SIGTERM set a process-wide flag. The daemon checks it between
//! cycles and while waiting for the next one, so a signal never interrupts
//! an artifact write half-way.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal::unix::{signal, SignalKind};
use tokio::time::Instant;
use tracing::{info, warn};

/// Longest single sleep while waiting between cycles
const WAIT_SLICE: Duration = Duration::from_millis(250);

/// Global flag indicating whether a shutdown has been requested.
static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);

/// Check if shutdown has been requested.
#[inline]
pub fn is_shutdown_requested() -> bool {
    SHUTDOWN_REQUESTED.load(Ordering::Relaxed)
}

/// Request a shutdown (can be called from signal handlers or tests).
pub fn request_shutdown() {
    SHUTDOWN_REQUESTED.store(true, Ordering::Relaxed);
}

/// Spawns the task listening for SIGINT and SIGTERM.
pub struct ShutdownGuard {
    _marker: (),
}

impl ShutdownGuard {
    /// Start listening for signals.
    ///
    /// If no handler can be registered the guard is still created; the
    /// daemon then only stops when killed.
    pub fn new() -> Self {
        tokio::spawn(async move {
            let sigint = match signal(SignalKind::interrupt()) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("Failed to register SIGINT handler: {}", e);
                    None
                }
            };

            let sigterm = match signal(SignalKind::terminate()) {
                Ok(s) => Some(s),
                Err(e) => {
                    warn!("Failed to register SIGTERM handler: {}", e);
                    None
                }
            };

            match (sigint, sigterm) {
                (Some(mut int), Some(mut term)) => {
                    tokio::select! {
                        _ = int.recv() => info!("Received SIGINT, stopping after the current step"),
                        _ = term.recv() => info!("Received SIGTERM, stopping after the current step"),
                    }
                    request_shutdown();
                }
                (Some(mut int), None) => {
                    int.recv().await;
                    info!("Received SIGINT, stopping after the current step");
                    request_shutdown();
                }
                (None, Some(mut term)) => {
                    term.recv().await;
                    info!("Received SIGTERM, stopping after the current step");
                    request_shutdown();
                }
                (None, None) => {
                    warn!("No signal handlers registered - graceful shutdown disabled");
                }
            }
        });

        Self { _marker: () }
    }
}

impl Default for ShutdownGuard {
    fn default() -> Self {
        Self::new()
    }
}

/// A token that can be shared across tasks to check for shutdown.
#[derive(Clone)]
pub struct ShutdownToken {
    flag: Arc<AtomicBool>,
}

impl ShutdownToken {
    pub fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    /// True once this token or the process-wide flag was cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed) || is_shutdown_requested()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }
}

impl Default for ShutdownToken {
    fn default() -> Self {
        Self::new()
    }
}

/// Sleep for `interval` unless cancelled first.
///
/// Returns `true` when the full interval elapsed and `false` when the
/// token was cancelled.
pub async fn wait_for_interval(interval: Duration, token: &ShutdownToken) -> bool {
    let deadline = Instant::now() + interval;

    loop {
        if token.is_cancelled() {
            return false;
        }
        let now = Instant::now();
        if now >= deadline {
            return true;
        }
        tokio::time::sleep(WAIT_SLICE.min(deadline - now)).await;
    }
}
