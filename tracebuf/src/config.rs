//! Resolved runtime configuration
//!
//! [`Args`] is what the user typed; [`Config`] is what the server runs with.
//! Resolution validates the numbers and turns the elevation string into an
//! argv prefix.

use anyhow::{bail, Result};
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::Args;
use crate::execution::StartSettings;
use crate::launch::{EnvCredential, ToolLauncher};

/// Shortest timeout a program can ask for, in seconds
pub const MIN_TIMEOUT_SECS: i64 = 1;

/// Upper bound for every duration flag, in seconds (one week)
pub const MAX_DURATION_SECS: u64 = 7 * 24 * 3600;

#[derive(Debug, Clone)]
pub struct Config {
    pub binary: PathBuf,
    /// Empty means no elevation
    pub elevation: Vec<String>,
    pub credential_env: String,
    pub max_lines: usize,
    pub max_timeout_secs: i64,
    pub start_grace: Duration,
    pub termination_grace: Duration,
    pub gc_interval: Duration,
    pub retention: Duration,
    pub kill_evicted: bool,
    pub probe_list_timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("bpftrace"),
            elevation: vec!["sudo".to_string(), "-S".to_string()],
            credential_env: "TRACEBUF_CREDENTIAL".to_string(),
            max_lines: 10_000,
            max_timeout_secs: 60,
            start_grace: Duration::from_millis(500),
            termination_grace: Duration::from_millis(500),
            gc_interval: Duration::from_secs(300),
            retention: Duration::from_secs(3600),
            kill_evicted: true,
            probe_list_timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    /// Validate CLI arguments and build the runtime configuration
    ///
    /// # Errors
    /// Returns an error for zero intervals, durations beyond
    /// [`MAX_DURATION_SECS`], a timeout bound below the minimum, or an empty
    /// credential variable name.
    pub fn from_args(args: &Args) -> Result<Self> {
        if args.max_timeout < MIN_TIMEOUT_SECS {
            bail!(
                "--max-timeout must be at least {MIN_TIMEOUT_SECS} second(s), got {}",
                args.max_timeout
            );
        }
        if args.gc_interval == 0 {
            bail!("--gc-interval must be greater than zero");
        }
        if args.probe_list_timeout == 0 {
            bail!("--probe-list-timeout must be greater than zero");
        }
        for (flag, secs) in [
            ("--max-timeout", args.max_timeout.unsigned_abs()),
            ("--gc-interval", args.gc_interval),
            ("--retention", args.retention),
            ("--probe-list-timeout", args.probe_list_timeout),
        ] {
            if secs > MAX_DURATION_SECS {
                bail!("{flag} must be at most {MAX_DURATION_SECS} seconds, got {secs}");
            }
        }
        if args.credential_env.trim().is_empty() {
            bail!("--credential-env must name an environment variable");
        }

        let elevation = if args.no_elevate {
            Vec::new()
        } else {
            args.elevate.split_whitespace().map(str::to_string).collect()
        };

        Ok(Self {
            binary: args.binary.clone(),
            elevation,
            credential_env: args.credential_env.clone(),
            max_lines: args.max_lines,
            max_timeout_secs: args.max_timeout,
            gc_interval: Duration::from_secs(args.gc_interval),
            retention: Duration::from_secs(args.retention),
            kill_evicted: !args.keep_evicted_running,
            probe_list_timeout: Duration::from_secs(args.probe_list_timeout),
            ..Self::default()
        })
    }

    #[must_use]
    pub fn launcher(&self) -> ToolLauncher {
        ToolLauncher::new(self.binary.clone(), self.elevation.clone())
    }

    #[must_use]
    pub fn credentials(&self) -> EnvCredential {
        EnvCredential::new(self.credential_env.clone())
    }

    #[must_use]
    pub fn start_settings(&self) -> StartSettings {
        StartSettings {
            timeout_bounds: MIN_TIMEOUT_SECS..=self.max_timeout_secs,
            start_grace: self.start_grace,
            max_lines: self.max_lines,
        }
    }

    #[must_use]
    pub fn is_elevated(&self) -> bool {
        !self.elevation.is_empty()
    }
}
