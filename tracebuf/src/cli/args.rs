//! CLI argument definitions

use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "tracebuf",
    version,
    about = "Run bpftrace programs in the background and page through their output",
    after_help = "\
EXAMPLES:
    tracebuf                                 Serve on stdio, elevate with `sudo -S`
    TRACEBUF_CREDENTIAL=... tracebuf         Feed the sudo password from the environment
    sudo tracebuf --no-elevate               Already root, run bpftrace directly
    tracebuf --binary /opt/bpftrace/bin/bpftrace --retention 600"
)]
pub struct Args {
    /// Tracing binary to run (name on PATH or absolute path)
    #[arg(long, env = "TRACEBUF_BINARY", default_value = "bpftrace")]
    pub binary: PathBuf,

    /// Elevation prefix, split on whitespace
    #[arg(long, env = "TRACEBUF_ELEVATE", default_value = "sudo -S")]
    pub elevate: String,

    /// Run the tracing binary without any elevation prefix
    #[arg(long)]
    pub no_elevate: bool,

    /// Environment variable the elevation credential is read from
    #[arg(long, value_name = "VAR", default_value = "TRACEBUF_CREDENTIAL")]
    pub credential_env: String,

    /// Lines kept per execution before output is truncated
    #[arg(long, default_value = "10000")]
    pub max_lines: usize,

    /// Upper bound for the per-program timeout, in seconds
    #[arg(long, default_value = "60")]
    pub max_timeout: i64,

    /// Seconds between garbage collection passes
    #[arg(long, value_name = "SECS", default_value = "300")]
    pub gc_interval: u64,

    /// Seconds an execution is kept after it was started
    #[arg(long, value_name = "SECS", default_value = "3600")]
    pub retention: u64,

    /// Leave processes of evicted, still-running executions alive
    #[arg(long)]
    pub keep_evicted_running: bool,

    /// Seconds to wait for a probe listing
    #[arg(long, value_name = "SECS", default_value = "30")]
    pub probe_list_timeout: u64,

    /// Skip environment checks at startup
    #[arg(long)]
    pub skip_preflight: bool,

    /// Suppress non-essential output
    #[arg(short, long)]
    pub quiet: bool,
}
