//! Process launch capabilities
//!
//! The execution core never decides how the tracing binary is located,
//! elevated or authenticated. It is handed:
//! - a [`ProcessLauncher`] that builds the command line
//! - a [`CredentialSupplier`] that yields the elevation secret, if any
//!
//! Both are resolved from configuration in `main` and injected.

pub mod credential;
pub mod launcher;

pub use credential::{
    send_credential, Credential, CredentialSupplier, EnvCredential, NoCredential, StaticCredential,
};
pub use launcher::{signal_process_group, spawn_piped, ProcessLauncher, ToolLauncher};
