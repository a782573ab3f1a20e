//! Probe listing
//!
//! Runs the tracing binary in listing mode and waits for it. Faults are
//! reported inside the response, never as an `Err`.

use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tracebuf_common::ListProbesResponse;

use crate::domain::ExecutionError;
use crate::execution::strip_credential_prompt;
use crate::launch::{send_credential, spawn_piped, CredentialSupplier, ProcessLauncher};

#[derive(Debug, Clone)]
pub struct ProbeLister {
    launcher: Arc<dyn ProcessLauncher>,
    credentials: Arc<dyn CredentialSupplier>,
    timeout: Duration,
}

impl ProbeLister {
    #[must_use]
    pub fn new(
        launcher: Arc<dyn ProcessLauncher>,
        credentials: Arc<dyn CredentialSupplier>,
        timeout: Duration,
    ) -> Self {
        Self {
            launcher,
            credentials,
            timeout,
        }
    }

    /// List probes, optionally restricted by `filter`
    pub async fn list(&self, filter: Option<&str>) -> ListProbesResponse {
        match self.run(filter).await {
            Ok(response) => response,
            Err(e) => {
                warn!("probe listing failed: {e}");
                ListProbesResponse::failed(e.to_string())
            }
        }
    }

    async fn run(&self, filter: Option<&str>) -> Result<ListProbesResponse, ExecutionError> {
        let mut args = vec!["-l"];
        if let Some(filter) = filter.map(str::trim).filter(|f| !f.is_empty()) {
            args.push(filter);
        }

        let mut child = spawn_piped(self.launcher.command(&args))
            .map_err(ExecutionError::LaunchFault)?;
        let stdin = child
            .stdin
            .take()
            .ok_or(ExecutionError::MissingPipe("stdin"))?;
        send_credential(stdin, self.credentials.credential()).await;

        // Dropping the future on timeout drops the child, which kills it
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecutionError::Timeout)?
            .map_err(ExecutionError::StreamFault)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let message = strip_credential_prompt(&stderr);
            let message = if message.is_empty() {
                format!("probe listing exited with {}", output.status)
            } else {
                message.to_string()
            };
            return Ok(ListProbesResponse::failed(message));
        }

        let probes = parse_probe_listing(&String::from_utf8_lossy(&output.stdout));
        debug!("listed {} probes (filter {filter:?})", probes.len());
        Ok(ListProbesResponse::found(probes))
    }
}

/// Non-empty, trimmed lines, without credential prompt artifacts
#[must_use]
pub fn parse_probe_listing(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with("[sudo]"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::launch::{NoCredential, ToolLauncher};

    #[test]
    fn test_parse_skips_blank_and_prompt_lines() {
        let stdout = "[sudo] password for alice:\n\
                      tracepoint:syscalls:sys_enter_openat\n\
                      \n\
                      kprobe:do_sys_open  \n";
        assert_eq!(
            parse_probe_listing(stdout),
            vec!["tracepoint:syscalls:sys_enter_openat", "kprobe:do_sys_open"]
        );
    }

    #[test]
    fn test_parse_empty_output() {
        assert!(parse_probe_listing("").is_empty());
        assert!(parse_probe_listing("\n\n").is_empty());
    }

    #[tokio::test]
    async fn test_missing_binary_reported_inline() {
        let lister = ProbeLister::new(
            Arc::new(ToolLauncher::direct("/nonexistent/bpftrace")),
            Arc::new(NoCredential),
            Duration::from_secs(5),
        );
        let response = lister.list(None).await;
        assert!(response.probes.is_empty());
        assert_eq!(response.count, 0);
        assert!(response.error.unwrap().starts_with("Failed to spawn process"));
    }
}
