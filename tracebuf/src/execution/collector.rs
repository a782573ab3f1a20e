//! Garbage Collector
//!
//! Background task that evicts records older than the retention threshold.
//! Age is measured from creation, so a record is evicted even if it is still
//! running; in that case its process is stopped too (unless disabled), since
//! nobody could read its output any more.

use log::{debug, info};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use super::registry::ExecutionRegistry;

/// Longest tick period the timer is asked for
const MAX_PERIOD: Duration = Duration::from_secs(365 * 24 * 3600);

#[derive(Debug, Clone)]
pub struct GarbageCollector {
    registry: Arc<ExecutionRegistry>,
    interval: Duration,
    retention: Duration,
    kill_evicted: bool,
}

impl GarbageCollector {
    #[must_use]
    pub fn new(
        registry: Arc<ExecutionRegistry>,
        interval: Duration,
        retention: Duration,
        kill_evicted: bool,
    ) -> Self {
        Self {
            registry,
            interval,
            retention,
            kill_evicted,
        }
    }

    /// One collection pass against `now`. Returns the number of evicted
    /// records.
    pub fn collect(&self, now: std::time::Instant) -> usize {
        let evicted = self.registry.sweep(now, self.retention);
        for record in &evicted {
            let status = record.status();
            debug!(
                "evicting {} ({status}, age {:?})",
                record.id(),
                record.age(now)
            );
            if self.kill_evicted && !status.is_terminal() {
                info!(
                    "{}: evicted while running, stopping its process",
                    record.id()
                );
                record.evict();
            }
        }
        evicted.len()
    }

    /// Run [`collect`](Self::collect) every `interval` until `shutdown` fires
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let period = self.interval.min(MAX_PERIOD);
            let start = Instant::now().checked_add(period).unwrap_or_else(Instant::now);
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    () = shutdown.cancelled() => break,
                    _ = ticker.tick() => {
                        let evicted = self.collect(std::time::Instant::now());
                        if evicted > 0 {
                            let remaining = self.registry.len();
                            info!("collector evicted {evicted} records, {remaining} remain");
                        }
                    }
                }
            }
            debug!("collector stopped");
        })
    }
}
