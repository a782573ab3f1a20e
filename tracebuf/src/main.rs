//! # tracebuf - Main Entry Point
//!
//! Serves the MCP tool protocol on stdin/stdout. Logs go to stderr, since
//! stdout carries protocol messages only.

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};
use tokio_util::sync::CancellationToken;

use tracebuf::cli::Args;
use tracebuf::config::Config;
use tracebuf::preflight::run_preflight_checks;
use tracebuf::server::{serve, TracebufServer};
use tracebuf::service::ExecutionService;

// Exit codes
const EXIT_SUCCESS: i32 = 0;
const EXIT_ERROR: i32 = 1;
const EXIT_USAGE: i32 = 2;
const EXIT_NOPERM: i32 = 77;

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Stderr)
        .init();
    std::process::exit(match run() {
        Ok(()) => EXIT_SUCCESS,
        Err(e) => {
            let code = exit_code_for(&e);
            eprintln!("error: {e:#}");
            code
        }
    });
}

fn exit_code_for(err: &anyhow::Error) -> i32 {
    let msg = err.to_string().to_lowercase();
    if msg.contains("permission denied") || msg.contains("requires root") {
        EXIT_NOPERM
    } else if msg.starts_with("--") {
        // Config validation names the offending flag first
        EXIT_USAGE
    } else {
        EXIT_ERROR
    }
}

#[tokio::main]
async fn run() -> Result<()> {
    let args = Args::parse();
    let config = Config::from_args(&args)?;

    if args.skip_preflight {
        info!("skipping pre-flight checks");
    } else {
        let warnings = run_preflight_checks(&config, args.quiet)?;
        if warnings > 0 && !args.quiet {
            warn!("{warnings} pre-flight check(s) failed, starting anyway");
        }
    }

    if !args.quiet {
        let elevation = if config.is_elevated() {
            config.elevation.join(" ")
        } else {
            "none".to_string()
        };
        info!(
            "tracebuf v{} serving MCP on stdio (binary: {}, elevation: {elevation})",
            env!("CARGO_PKG_VERSION"),
            config.binary.display(),
        );
    }

    let service = ExecutionService::from_config(&config);
    let shutdown = CancellationToken::new();
    let collector = service.spawn_collector(shutdown.clone());

    let server = TracebufServer::new(service);
    let served = serve(server, tokio::io::stdin(), tokio::io::stdout()).await;

    shutdown.cancel();
    collector.await.context("garbage collector task panicked")?;
    served?;

    info!("stdin closed, shutting down");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_for_permission() {
        let err = anyhow::anyhow!("Permission denied: not running as root");
        assert_eq!(exit_code_for(&err), EXIT_NOPERM);
    }

    #[test]
    fn test_exit_code_for_bad_flag() {
        let err = anyhow::anyhow!("--gc-interval must be greater than zero");
        assert_eq!(exit_code_for(&err), EXIT_USAGE);
    }

    #[test]
    fn test_exit_code_generic() {
        let err = anyhow::anyhow!("tool protocol handshake failed");
        assert_eq!(exit_code_for(&err), EXIT_ERROR);
    }
}
