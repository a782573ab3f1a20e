//! Execution service
//!
//! Owns the registry and wires the execution core and the one-shot tools
//! together behind the four tool operations. The server holds one of these;
//! tests build their own with a fake launcher.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracebuf_common::{
    ExecProgramRequest, ExecProgramResponse, GetResultRequest, GetResultResponse,
    ListHelpersResponse, ListProbesRequest, ListProbesResponse,
};

use crate::config::Config;
use crate::execution::{
    ExecutionRegistry, GarbageCollector, ProcessRunner, ResultPager, StartCoordinator,
};
use crate::launch::{CredentialSupplier, ProcessLauncher};
use crate::tools::{list_helpers, ProbeLister};

#[derive(Debug, Clone)]
pub struct ExecutionService {
    registry: Arc<ExecutionRegistry>,
    coordinator: StartCoordinator,
    pager: ResultPager,
    probes: ProbeLister,
    collector: GarbageCollector,
}

impl ExecutionService {
    #[must_use]
    pub fn new(
        config: &Config,
        launcher: Arc<dyn ProcessLauncher>,
        credentials: Arc<dyn CredentialSupplier>,
    ) -> Self {
        let registry = Arc::new(ExecutionRegistry::new());
        let runner = ProcessRunner::new(
            Arc::clone(&launcher),
            Arc::clone(&credentials),
            config.termination_grace,
        );
        Self {
            coordinator: StartCoordinator::new(
                Arc::clone(&registry),
                runner,
                config.start_settings(),
            ),
            pager: ResultPager::new(Arc::clone(&registry)),
            probes: ProbeLister::new(launcher, credentials, config.probe_list_timeout),
            collector: GarbageCollector::new(
                Arc::clone(&registry),
                config.gc_interval,
                config.retention,
                config.kill_evicted,
            ),
            registry,
        }
    }

    /// Build from configuration alone, using its launcher and credential
    /// supplier
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config,
            Arc::new(config.launcher()),
            Arc::new(config.credentials()),
        )
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<ExecutionRegistry> {
        &self.registry
    }

    /// Start the background collector; it stops when `shutdown` is cancelled
    pub fn spawn_collector(&self, shutdown: CancellationToken) -> JoinHandle<()> {
        self.collector.clone().spawn(shutdown)
    }

    pub async fn exec_program(&self, request: ExecProgramRequest) -> ExecProgramResponse {
        self.coordinator.exec_program(request.program, request.timeout).await
    }

    #[must_use]
    pub fn get_result(&self, request: &GetResultRequest) -> GetResultResponse {
        self.pager.get_result(&request.execution_id, request.offset, request.limit)
    }

    pub async fn list_probes(&self, request: ListProbesRequest) -> ListProbesResponse {
        self.probes.list(request.filter.as_deref()).await
    }

    #[must_use]
    pub fn list_helpers(&self) -> ListHelpersResponse {
        list_helpers()
    }
}
