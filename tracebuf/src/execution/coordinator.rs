//! # Start Coordinator
//!
//! Entry point for `exec_program`: clamps the timeout, registers a record,
//! spawns its runner and waits a short grace period before answering.
//!
//! The grace period is a heuristic. A failure that shows up within it (bad
//! syntax, missing binary, refused elevation) is reported synchronously; one
//! that shows up later is only visible through `get_result`. A slow failure
//! and a healthy long-running trace look the same at the moment we answer.

use log::{debug, info};
use std::ops::RangeInclusive;
use std::sync::Arc;
use std::time::Duration;
use tracebuf_common::{ExecProgramResponse, ExecutionStatus};

use super::registry::ExecutionRegistry;
use super::runner::ProcessRunner;
use crate::domain::{ExecutionError, ExecutionId};

/// Message used when a run failed early without recording a reason
const START_FAILED_MESSAGE: &str = "Failed to start program";

#[derive(Debug, Clone)]
pub struct StartSettings {
    /// Supported timeout range, in seconds
    pub timeout_bounds: RangeInclusive<i64>,
    pub start_grace: Duration,
    pub max_lines: usize,
}

impl Default for StartSettings {
    fn default() -> Self {
        Self {
            timeout_bounds: 1..=60,
            start_grace: Duration::from_millis(500),
            max_lines: 10_000,
        }
    }
}

#[derive(Debug, Clone)]
pub struct StartCoordinator {
    registry: Arc<ExecutionRegistry>,
    runner: ProcessRunner,
    settings: StartSettings,
}

impl StartCoordinator {
    #[must_use]
    pub fn new(
        registry: Arc<ExecutionRegistry>,
        runner: ProcessRunner,
        settings: StartSettings,
    ) -> Self {
        Self {
            registry,
            runner,
            settings,
        }
    }

    /// Clamp a requested timeout into the supported range
    #[must_use]
    pub fn clamp_timeout(&self, requested_secs: i64) -> Duration {
        let bounds = &self.settings.timeout_bounds;
        let (lo, hi) = (*bounds.start(), *bounds.end());
        let secs = requested_secs.clamp(lo, hi.max(lo));
        Duration::from_secs(u64::try_from(secs).unwrap_or(1))
    }

    /// Start `program` and return its id once the grace period has passed
    ///
    /// # Errors
    /// [`ExecutionError::ImmediateLaunchFault`] if the run already failed
    /// within the grace period. The record stays registered either way.
    pub async fn start(
        &self,
        program: String,
        timeout_secs: i64,
    ) -> Result<ExecutionId, ExecutionError> {
        let timeout = self.clamp_timeout(timeout_secs);
        let (record, writer) = self.registry.register(self.settings.max_lines);
        let id = record.id().clone();
        info!("{id}: started (timeout {}s)", timeout.as_secs());

        let runner = self.runner.clone();
        tokio::spawn(async move { runner.run(writer, program, timeout).await });

        tokio::time::sleep(self.settings.start_grace).await;

        if record.status() == ExecutionStatus::Failed {
            let message = record
                .error_message()
                .unwrap_or_else(|| START_FAILED_MESSAGE.to_string());
            debug!("{id}: failed within start grace: {message}");
            return Err(ExecutionError::ImmediateLaunchFault(message));
        }
        Ok(id)
    }

    /// [`start`](Self::start) in its wire shape
    pub async fn exec_program(&self, program: String, timeout_secs: i64) -> ExecProgramResponse {
        match self.start(program, timeout_secs).await {
            Ok(id) => ExecProgramResponse::started(id.as_str()),
            Err(e) => ExecProgramResponse::rejected(e.to_string()),
        }
    }
}
