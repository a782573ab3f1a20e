//! # Shared Wire Types (Server ↔ Client)
//!
//! Request and response shapes for the four tracing tools exposed by the
//! `tracebuf` server. Both the server and any client that talks to it over
//! the tool protocol use these types, so the JSON field names here are the
//! contract.
//!
//! ## Tools
//!
//! - `list_probes` - [`ListProbesRequest`] → [`ListProbesResponse`]
//! - `list_helpers` - no arguments → [`ListHelpersResponse`]
//! - `exec_program` - [`ExecProgramRequest`] → [`ExecProgramResponse`]
//! - `get_result` - [`GetResultRequest`] → [`GetResultResponse`]
//!
//! ## Key Types
//!
//! - [`ExecutionStatus`] - Lifecycle state of one tracing run
//! - [`ResultPage`] - One page of buffered output plus run metadata

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};

// ============================================================================
// Defaults
// ============================================================================

/// Timeout applied when `exec_program` is called without one (seconds)
pub const DEFAULT_TIMEOUT_SECS: i64 = 10;

/// Page size applied when `get_result` is called without a limit
pub const DEFAULT_PAGE_LIMIT: i64 = 1000;

/// Error text returned by `get_result` for an unknown execution id
pub const NOT_FOUND_MESSAGE: &str = "Execution ID not found";

fn default_timeout() -> i64 {
    DEFAULT_TIMEOUT_SECS
}

fn default_limit() -> i64 {
    DEFAULT_PAGE_LIMIT
}

/// Accept any JSON number for an `i64` field, saturating at the bounds
///
/// Callers clamp these values anyway, so `2^64 - 1` means "as large as
/// possible" rather than a decode error. Fractions truncate toward zero.
fn saturating_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    Ok(saturate(&number))
}

#[allow(clippy::cast_possible_truncation)]
fn saturate(number: &serde_json::Number) -> i64 {
    if let Some(value) = number.as_i64() {
        value
    } else if number.is_u64() {
        i64::MAX
    } else {
        // `as` saturates, and maps NaN to 0
        number.as_f64().map_or(0, |value| value as i64)
    }
}

// ============================================================================
// Execution Lifecycle
// ============================================================================

/// Lifecycle state of a tracing run
///
/// Transitions exactly once from `Running` to one of the terminal states.
/// Serialized lowercase (`"running"`, `"completed"`, `"failed"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionStatus {
    Running,
    Completed,
    Failed,
}

impl ExecutionStatus {
    /// `Completed` or `Failed`
    #[must_use]
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Running)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// list_probes
// ============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ListProbesRequest {
    #[schemars(description = "Optional filter pattern (e.g., 'syscalls:*open*')")]
    #[serde(default)]
    pub filter: Option<String>,
}

/// Probe listing result
///
/// On failure `probes` is empty and `error` carries the tool's stderr or the
/// launch fault.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListProbesResponse {
    pub probes: Vec<String>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ListProbesResponse {
    #[must_use]
    pub fn found(probes: Vec<String>) -> Self {
        Self {
            count: probes.len(),
            probes,
            error: None,
        }
    }

    #[must_use]
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            probes: Vec::new(),
            count: 0,
            error: Some(error.into()),
        }
    }
}

// ============================================================================
// list_helpers
// ============================================================================

/// One builtin function or variable of the tracing language
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Helper {
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ListHelpersResponse {
    pub helpers: Vec<Helper>,
    pub count: usize,
}

// ============================================================================
// exec_program
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExecProgramRequest {
    /// Passed to the tracing binary as a single argument
    #[schemars(description = "The bpftrace program to execute")]
    pub program: String,

    /// Clamped server-side into the supported range
    #[schemars(description = "Execution timeout in seconds (default: 10, max: 60)")]
    #[schemars(with = "i64")]
    #[serde(default = "default_timeout", deserialize_with = "saturating_i64")]
    pub timeout: i64,
}

/// Outcome of starting a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum StartStatus {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExecProgramResponse {
    pub status: StartStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub execution_id: Option<String>,
    pub message: String,
}

impl ExecProgramResponse {
    #[must_use]
    pub fn started(execution_id: impl Into<String>) -> Self {
        Self {
            status: StartStatus::Success,
            execution_id: Some(execution_id.into()),
            message: "Program started successfully".to_string(),
        }
    }

    #[must_use]
    pub fn rejected(message: impl Into<String>) -> Self {
        Self {
            status: StartStatus::Error,
            execution_id: None,
            message: message.into(),
        }
    }
}

// ============================================================================
// get_result
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct GetResultRequest {
    #[schemars(description = "The execution ID returned by exec_program")]
    pub execution_id: String,

    /// Negative values are treated as 0
    #[schemars(description = "Start reading from this line number (default: 0)")]
    #[schemars(with = "i64")]
    #[serde(default, deserialize_with = "saturating_i64")]
    pub offset: i64,

    /// Negative values are treated as 0
    #[schemars(description = "Maximum lines to return (default: 1000)")]
    #[schemars(with = "i64")]
    #[serde(default = "default_limit", deserialize_with = "saturating_i64")]
    pub limit: i64,
}

/// One page of a run's buffered output
///
/// `duration` (seconds) is present once the run is terminal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ResultPage {
    pub execution_id: String,
    pub status: ExecutionStatus,
    pub lines_total: usize,
    pub lines_returned: usize,
    pub output: Vec<String>,
    pub has_more: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
}

/// Shape returned for an execution id the server does not know
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NotFound {
    pub error: String,
    pub execution_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum GetResultResponse {
    Page(ResultPage),
    NotFound(NotFound),
}

impl GetResultResponse {
    #[must_use]
    pub fn not_found(execution_id: impl Into<String>) -> Self {
        Self::NotFound(NotFound {
            error: NOT_FOUND_MESSAGE.to_string(),
            execution_id: execution_id.into(),
        })
    }
}
