//! # Execution Record
//!
//! Output buffer and lifecycle state for one tracing run.
//!
//! A record is shared (`Arc`) between the registry, the pager and the runner,
//! but only the runner holds the [`RecordWriter`]. The writer is not `Clone`,
//! so there is exactly one mutator per record. Everyone else reads through
//! `&ExecutionRecord`, which takes a read lock and copies out what it needs.
//!
//! ## Buffer bound
//!
//! At most `max_lines` raw lines are kept. The first line past the bound is
//! replaced by a single truncation marker and every later line is dropped,
//! so `lines.len() <= max_lines + 1` always holds.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracebuf_common::ExecutionStatus;

use crate::domain::ExecutionId;

/// Message recorded when a writer goes away without finalizing its record
pub const ABANDONED_MESSAGE: &str = "Runner exited before the execution finished";

/// Synthetic marker appended once the buffer is full
#[must_use]
pub fn truncation_marker(max_lines: usize) -> String {
    format!("[Output truncated at {max_lines} lines]")
}

#[derive(Debug)]
struct RecordState {
    status: ExecutionStatus,
    lines: Vec<String>,
    completed_at: Option<Instant>,
    error_message: Option<String>,
    pid: Option<u32>,
}

impl RecordState {
    fn push_line(&mut self, line: String, max_lines: usize) {
        if self.lines.len() < max_lines {
            self.lines.push(line);
        } else if self.lines.len() == max_lines {
            self.lines.push(truncation_marker(max_lines));
        }
    }

    fn finish(&mut self, status: ExecutionStatus, error: Option<String>) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = status;
        self.completed_at = Some(Instant::now());
        self.error_message = error;
        self.pid = None;
        true
    }
}

/// Slice of a record's buffer taken under a single read lock
#[derive(Debug, Clone, PartialEq)]
pub struct PageSlice {
    pub status: ExecutionStatus,
    pub lines_total: usize,
    pub output: Vec<String>,
    pub has_more: bool,
    pub error_message: Option<String>,
    pub duration: Option<Duration>,
}

/// One tracing run: identity, timestamps, eviction signal, guarded state
#[derive(Debug)]
pub struct ExecutionRecord {
    id: ExecutionId,
    max_lines: usize,
    created_at: Instant,
    eviction: CancellationToken,
    state: RwLock<RecordState>,
}

impl ExecutionRecord {
    /// Create a `Running` record and the one writer allowed to mutate it
    #[must_use]
    pub fn create(
        id: ExecutionId,
        max_lines: usize,
        created_at: Instant,
    ) -> (Arc<Self>, RecordWriter) {
        let record = Arc::new(Self {
            id,
            max_lines,
            created_at,
            eviction: CancellationToken::new(),
            state: RwLock::new(RecordState {
                status: ExecutionStatus::Running,
                lines: Vec::new(),
                completed_at: None,
                error_message: None,
                pid: None,
            }),
        });
        let writer = RecordWriter {
            record: Arc::clone(&record),
        };
        (record, writer)
    }

    #[must_use]
    pub fn id(&self) -> &ExecutionId {
        &self.id
    }

    /// Time elapsed since creation, measured against `now`
    #[must_use]
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.created_at)
    }

    #[must_use]
    pub fn status(&self) -> ExecutionStatus {
        self.state.read().status
    }

    #[must_use]
    pub fn error_message(&self) -> Option<String> {
        self.state.read().error_message.clone()
    }

    #[must_use]
    pub fn completed_at(&self) -> Option<Instant> {
        self.state.read().completed_at
    }

    /// PID of the live process, only while `Running`
    #[must_use]
    pub fn pid(&self) -> Option<u32> {
        self.state.read().pid
    }

    #[must_use]
    pub fn lines_total(&self) -> usize {
        self.state.read().lines.len()
    }

    /// Copy of the full buffer
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.state.read().lines.clone()
    }

    /// Copy out `lines[offset..min(offset + limit, total)]` together with the
    /// status fields, all from the same lock acquisition.
    #[must_use]
    pub fn page(&self, offset: usize, limit: usize) -> PageSlice {
        let state = self.state.read();
        let total = state.lines.len();
        let end = offset.saturating_add(limit).min(total);
        let output = if offset < end { state.lines[offset..end].to_vec() } else { Vec::new() };
        PageSlice {
            status: state.status,
            lines_total: total,
            output,
            has_more: end < total,
            error_message: state.error_message.clone(),
            duration: state
                .completed_at
                .map(|done| done.saturating_duration_since(self.created_at)),
        }
    }

    /// Ask the owning runner to stop the process. Has no effect once the
    /// runner has finished.
    pub fn evict(&self) {
        self.eviction.cancel();
    }

    #[must_use]
    pub fn is_evicted(&self) -> bool {
        self.eviction.is_cancelled()
    }

    /// Resolves once [`evict`](Self::evict) has been called
    pub fn evicted(&self) -> WaitForCancellationFuture<'_> {
        self.eviction.cancelled()
    }
}

/// Exclusive write handle for one [`ExecutionRecord`]
///
/// Dropping a writer while its record is still `Running` marks the record
/// `Failed` with [`ABANDONED_MESSAGE`], so a panicking or aborted runner can
/// never leave a record running forever.
#[derive(Debug)]
pub struct RecordWriter {
    record: Arc<ExecutionRecord>,
}

impl RecordWriter {
    #[must_use]
    pub fn record(&self) -> &Arc<ExecutionRecord> {
        &self.record
    }

    /// Append one line, applying the truncation rule
    pub fn push_line(&mut self, line: impl Into<String>) {
        let max_lines = self.record.max_lines;
        self.record.state.write().push_line(line.into(), max_lines);
    }

    pub fn set_pid(&mut self, pid: Option<u32>) {
        let mut state = self.record.state.write();
        if !state.status.is_terminal() {
            state.pid = pid;
        }
    }

    /// Transition to `Completed`. Returns false if already terminal.
    pub fn complete(&mut self) -> bool {
        self.record.state.write().finish(ExecutionStatus::Completed, None)
    }

    /// Transition to `Failed` with `message`. Returns false if already terminal.
    pub fn fail(&mut self, message: impl Into<String>) -> bool {
        self.record
            .state
            .write()
            .finish(ExecutionStatus::Failed, Some(message.into()))
    }

    #[must_use]
    pub fn is_terminal(&self) -> bool {
        self.record.status().is_terminal()
    }
}

impl Drop for RecordWriter {
    fn drop(&mut self) {
        if self.fail(ABANDONED_MESSAGE) {
            log::warn!("{}: writer dropped while running", self.record.id);
        }
    }
}
