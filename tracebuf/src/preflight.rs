//! Pre-flight checks for tracebuf
//!
//! Looks at the environment before the server starts taking requests. Only a
//! missing privilege path is fatal. Everything else shows up as a warning on
//! stderr with the likely fix, and would also surface per call as a launch
//! error.

#![allow(unsafe_code)] // geteuid() requires unsafe

use anyhow::{bail, Context, Result};
use log::{info, warn};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use crate::config::Config;

/// Oldest kernel bpftrace supports
const MIN_KERNEL_VERSION: (u32, u32) = (4, 9);

/// Run all pre-flight checks, logging each non-fatal failure as a warning
///
/// Returns the number of warnings.
///
/// # Errors
/// Not root and elevation disabled: no program could ever start.
pub fn run_preflight_checks(config: &Config, quiet: bool) -> Result<usize> {
    check_privileges(config)?;

    let checks = [
        check_binary_exists(&config.binary).map(|path| {
            info!("tracing binary: {}", path.display());
        }),
        check_kernel_version(),
        check_credential(config),
    ];

    let mut failed = 0;
    for result in checks {
        if let Err(e) = result {
            failed += 1;
            if !quiet {
                warn!("{e:#}");
            }
        }
    }
    Ok(failed)
}

/// Resolve the tracing binary the way `execvp` would
fn check_binary_exists(binary: &Path) -> Result<PathBuf> {
    if binary.components().count() > 1 {
        if is_executable(binary) {
            return Ok(binary.to_path_buf());
        }
        bail!(
            "Binary not found or not executable: {}\n\n\
             Point --binary at an installed bpftrace.",
            binary.display()
        );
    }

    let path_var = std::env::var_os("PATH").unwrap_or_default();
    if let Some(found) = std::env::split_paths(&path_var)
        .map(|dir| dir.join(binary))
        .find(|candidate| is_executable(candidate))
    {
        return Ok(found);
    }
    bail!(
        "Binary not found on PATH: {}\n\n\
         Install bpftrace or pass --binary /path/to/bpftrace.",
        binary.display()
    )
}

fn is_executable(path: &Path) -> bool {
    std::fs::metadata(path)
        .is_ok_and(|meta| meta.is_file() && meta.permissions().mode() & 0o111 != 0)
}

/// Check if the kernel version is recent enough for bpftrace
fn check_kernel_version() -> Result<()> {
    let version_str = std::fs::read_to_string("/proc/version")
        .context("Failed to read kernel version from /proc/version")?;

    // "Linux version 6.1.0-arch1-1 ..."
    let release = version_str.split_whitespace().nth(2).unwrap_or("unknown");
    let Some((major, minor)) = parse_kernel_release(release) else {
        // Can't parse, assume it's fine
        return Ok(());
    };

    if (major, minor) < MIN_KERNEL_VERSION {
        bail!(
            "Kernel version {major}.{minor} is too old.\n\n\
             bpftrace requires Linux {}.{} or newer.\n\
             Current kernel: {release}",
            MIN_KERNEL_VERSION.0,
            MIN_KERNEL_VERSION.1,
        );
    }
    Ok(())
}

fn parse_kernel_release(release: &str) -> Option<(u32, u32)> {
    let mut parts = release.split('.');
    let major = parts.next()?.parse().ok()?;
    let minor = parts
        .next()?
        .chars()
        .take_while(char::is_ascii_digit)
        .collect::<String>()
        .parse()
        .ok()?;
    Some((major, minor))
}

/// Tracing needs root: either we are root, or we elevate per call
fn check_privileges(config: &Config) -> Result<()> {
    if unsafe { libc::geteuid() } == 0 || config.is_elevated() {
        return Ok(());
    }
    bail!(
        "Permission denied: not running as root and elevation is disabled.\n\n\
         Run with: sudo tracebuf --no-elevate, or drop --no-elevate"
    );
}

/// `sudo -S` reads the password from stdin; without one it only works with
/// NOPASSWD or a cached ticket
fn check_credential(config: &Config) -> Result<()> {
    if !config.is_elevated() || unsafe { libc::geteuid() } == 0 {
        return Ok(());
    }
    match std::env::var(&config.credential_env) {
        Ok(value) if !value.is_empty() => Ok(()),
        _ => bail!(
            "No elevation credential in ${}.\n\n\
             Programs will only start if `{}` needs no password.",
            config.credential_env,
            config.elevation.join(" ")
        ),
    }
}
