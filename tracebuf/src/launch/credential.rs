//! Elevation credential supply
//!
//! The credential is written to the spawned process's stdin (for `sudo -S`).
//! Nothing here embeds a secret; the default supplier reads an environment
//! variable each time it is asked.

use log::debug;
use std::fmt;
use tokio::io::AsyncWriteExt;
use tokio::process::ChildStdin;

/// Secret text; `Debug` never prints the value
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(secret.into())
    }

    #[cfg(test)]
    fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

pub trait CredentialSupplier: Send + Sync + fmt::Debug {
    fn credential(&self) -> Option<Credential>;
}

/// Supplies nothing; stdin is closed right after spawn
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCredential;

impl CredentialSupplier for NoCredential {
    fn credential(&self) -> Option<Credential> {
        None
    }
}

/// Reads the credential from an environment variable at each launch
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    #[must_use]
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSupplier for EnvCredential {
    fn credential(&self) -> Option<Credential> {
        std::env::var(&self.var)
            .ok()
            .filter(|v| !v.is_empty())
            .map(Credential)
    }
}

/// Fixed credential, handed in by the embedder
#[derive(Debug, Clone)]
pub struct StaticCredential(Credential);

impl StaticCredential {
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Credential::new(secret))
    }
}

impl CredentialSupplier for StaticCredential {
    fn credential(&self) -> Option<Credential> {
        Some(self.0.clone())
    }
}

/// Write the credential and a newline, flush, then close stdin
///
/// Write failures are not fatal: a process that never reads stdin (no
/// elevation prompt) may already have exited.
pub async fn send_credential(mut stdin: ChildStdin, credential: Option<Credential>) {
    if let Some(credential) = credential {
        let mut payload = credential.0.into_bytes();
        payload.push(b'\n');
        if let Err(e) = stdin.write_all(&payload).await {
            debug!("credential write failed: {e}");
        } else if let Err(e) = stdin.flush().await {
            debug!("credential flush failed: {e}");
        }
    }
    drop(stdin);
}
