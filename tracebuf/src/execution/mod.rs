//! Execution core
//!
//! Everything between "start this program" and "here is page N of its
//! output":
//! - `record`: per-run buffer and lifecycle state, single writer
//! - `registry`: id → record map shared by all tasks
//! - `runner`: spawns the tracing binary and streams its output
//! - `collector`: periodic eviction of old records
//! - `pager`: offset/limit reads of a record
//! - `coordinator`: `exec_program` with its start grace period

pub mod collector;
pub mod coordinator;
pub mod pager;
pub mod record;
pub mod registry;
pub mod runner;

// Re-export common types
pub use collector::GarbageCollector;
pub use coordinator::{StartCoordinator, StartSettings};
pub use pager::ResultPager;
pub use record::{truncation_marker, ExecutionRecord, PageSlice, RecordWriter};
pub use registry::ExecutionRegistry;
pub use runner::{
    strip_credential_prompt, tool_error, ProcessRunner, LINE_TRUNCATED_SUFFIX, MAX_LINE_BYTES,
    MAX_STDERR_BYTES, TIMEOUT_LINE,
};
