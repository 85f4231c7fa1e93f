//! Web server reload after the deny-rule fragment changes.

use tracing::{info, warn};

use crate::cmd_abstraction::{args_to_strings, CommandExecutor};

/// Service name passed to `service <name> reload`.
pub fn service_name(server_type: &str) -> Option<&'static str> {
    match server_type {
        "nginx" => Some("nginx"),
        "apache" => Some("apache2"),
        _ => None,
    }
}

/// Ask the web server to pick up new deny rules.
///
/// Returns whether the reload succeeded. Failures are logged and never
/// abort the cycle.
pub fn reload_server(executor: &dyn CommandExecutor, server_type: &str) -> bool {
    let Some(service) = service_name(server_type) else {
        warn!("No reload command known for server type '{}'", server_type);
        return false;
    };

    match executor.execute("service", &args_to_strings(&[service, "reload"])) {
        Ok(output) if output.success => {
            info!("Reloaded {}", service);
            true
        }
        Ok(output) => {
            warn!(
                "Reloading {} failed (status {:?}): {}",
                service,
                output.code,
                output.combined().trim()
            );
            false
        }
        Err(e) => {
            warn!("Could not run reload for {}: {:#}", service, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_abstraction::{CommandOutput, MockCommandExecutor};

    fn output(success: bool) -> CommandOutput {
        CommandOutput {
            stdout: String::new(),
            stderr: if success { String::new() } else { "Job failed".to_string() },
            success,
            code: Some(if success { 0 } else { 1 }),
        }
    }

    #[test]
    fn test_service_names() {
        assert_eq!(service_name("nginx"), Some("nginx"));
        assert_eq!(service_name("apache"), Some("apache2"));
        assert_eq!(service_name("lighttpd"), None);
    }

    #[test]
    fn test_reload_apache_runs_apache2() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .withf(|cmd, args| cmd == "service" && args.join(" ") == "apache2 reload")
            .times(1)
            .returning(|_, _| Ok(output(true)));
        assert!(reload_server(&mock, "apache"));
    }

    #[test]
    fn test_reload_failure_not_fatal() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute().returning(|_, _| Ok(output(false)));
        assert!(!reload_server(&mock, "nginx"));
    }

    #[test]
    fn test_reload_spawn_error_not_fatal() {
        let mut mock = MockCommandExecutor::new();
        mock.expect_execute()
            .returning(|_, _| Err(anyhow::anyhow!("service: not found")));
        assert!(!reload_server(&mock, "nginx"));
    }

    #[test]
    fn test_unknown_server_runs_nothing() {
        let mock = MockCommandExecutor::new();
        assert!(!reload_server(&mock, "iis"));
    }
}
