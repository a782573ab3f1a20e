//! Fake tracing binary for integration tests
//!
//! A shell script that behaves like bpftrace from the outside: it reads the
//! elevation credential from stdin, `-e <program>` evaluates the program as
//! shell, and `-l [filter]` prints a fixed probe list filtered by glob.

#![allow(dead_code)]

use std::os::unix::fs::PermissionsExt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tempfile::TempDir;
use tracebuf::config::Config;
use tracebuf::launch::{CredentialSupplier, NoCredential, ToolLauncher};
use tracebuf::service::ExecutionService;
use tracebuf_common::{GetResultRequest, GetResultResponse, ResultPage};

const FAKE_BPFTRACE: &str = r#"#!/bin/sh
read -r credential || true
case "$1" in
  -l)
    if [ "$2" = "broken:*" ]; then
      echo "ERROR: invalid probe filter" >&2
      exit 1
    fi
    for probe in \
        tracepoint:syscalls:sys_enter_openat \
        tracepoint:syscalls:sys_exit_openat \
        kprobe:vfs_read; do
      case "$probe" in ${2:-*}) echo "$probe" ;; esac
    done
    ;;
  -e)
    eval "$2"
    ;;
  *)
    echo "usage: bpftrace -e PROGRAM | -l [FILTER]" >&2
    exit 64
    ;;
esac
"#;

pub struct FakeTool {
    // Held so the script outlives the test
    _dir: TempDir,
    pub path: PathBuf,
}

impl FakeTool {
    pub fn install() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bpftrace");
        std::fs::write(&path, FAKE_BPFTRACE).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        Self { _dir: dir, path }
    }

    pub fn service(&self, config: &Config) -> ExecutionService {
        self.service_with(config, Arc::new(NoCredential))
    }

    pub fn service_with(
        &self,
        config: &Config,
        credentials: Arc<dyn CredentialSupplier>,
    ) -> ExecutionService {
        let launcher = Arc::new(ToolLauncher::direct(&self.path));
        ExecutionService::new(config, launcher, credentials)
    }
}

/// Short grace periods so tests run quickly
pub fn test_config() -> Config {
    Config {
        binary: "bpftrace".into(),
        elevation: Vec::new(),
        start_grace: Duration::from_millis(300),
        termination_grace: Duration::from_millis(300),
        ..Config::default()
    }
}

pub fn page(service: &ExecutionService, id: &str, offset: i64, limit: i64) -> ResultPage {
    let request = GetResultRequest {
        execution_id: id.to_string(),
        offset,
        limit,
    };
    match service.get_result(&request) {
        GetResultResponse::Page(page) => page,
        GetResultResponse::NotFound(nf) => panic!("{} not found: {}", nf.execution_id, nf.error),
    }
}

/// Poll until the execution reaches a terminal state or `within` elapses
pub async fn wait_terminal(service: &ExecutionService, id: &str, within: Duration) -> ResultPage {
    let deadline = Instant::now() + within;
    loop {
        let current = page(service, id, 0, 100_000);
        if current.status.is_terminal() {
            return current;
        }
        let status = current.status;
        assert!(
            Instant::now() < deadline,
            "{id} still {status} after {within:?}"
        );
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
