//! Structured error types for tracebuf
//!
//! Using thiserror for automatic Display implementation and error chaining.
//! The `Display` text of an [`ExecutionError`] is what ends up in a record's
//! `error_message`, so the wording here is user-visible.

use super::types::ExecutionId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExecutionError {
    #[error("Failed to spawn process: {0}")]
    LaunchFault(#[source] std::io::Error),

    #[error("Read error: {0}")]
    StreamFault(#[source] std::io::Error),

    #[error("Process {0} pipe was not captured")]
    MissingPipe(&'static str),

    #[error("Timeout")]
    Timeout,

    /// Non-benign stderr output from the tracing tool
    #[error("{0}")]
    ToolError(String),

    #[error("Evicted after exceeding retention")]
    Evicted,

    #[error("Execution ID not found")]
    NotFound(ExecutionId),

    /// Failure observed before `exec_program` returned
    #[error("{0}")]
    ImmediateLaunchFault(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_message_is_bare() {
        assert_eq!(ExecutionError::Timeout.to_string(), "Timeout");
    }

    #[test]
    fn test_launch_fault_display() {
        let err = ExecutionError::LaunchFault(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "No such file or directory",
        ));
        assert!(err.to_string().starts_with("Failed to spawn process:"));
        assert!(err.to_string().contains("No such file"));
    }

    #[test]
    fn test_not_found_display() {
        let err = ExecutionError::NotFound(ExecutionId::from("exec_12345678"));
        assert_eq!(err.to_string(), "Execution ID not found");
    }

    #[test]
    fn test_tool_error_passes_text_through() {
        let err = ExecutionError::ToolError("stdin:1:1-6: ERROR: syntax error".to_string());
        assert_eq!(err.to_string(), "stdin:1:1-6: ERROR: syntax error");
    }
}
