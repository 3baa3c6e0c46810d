//! Concurrent health aggregation.
//!
//! [`HealthAggregator::check_all`] probes every directory entry at once,
//! each probe in its own task behind a concurrency cap, and assembles the
//! results in directory order. A probe that fails, times out or panics
//! yields a record for its server; it never cancels or delays the others.
//! Dropping the `check_all` future aborts the probes still in flight.
//!
//! [`HealthAggregator::spawn_monitor`] repeats the check on an interval and
//! keeps the recent reports in a [`HealthHistory`].

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use switchyard_client::BackendClient;
use switchyard_core::{AggregateHealthReport, BackgroundTask, HealthRecord, ShutdownSignal};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::directory::{ServerDirectory, ServerRecord};

/// Default bound on one health probe.
pub const DEFAULT_HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

/// Default number of probes allowed in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 50;

/// Default number of reports kept by [`HealthHistory`].
pub const DEFAULT_HISTORY_SIZE: usize = 20;

// ============================================================================
// HealthAggregator
// ============================================================================

/// Polls the health endpoint of every server in a directory.
#[derive(Clone, Debug)]
pub struct HealthAggregator {
    directory: Arc<ServerDirectory>,
    client: BackendClient,
    timeout: Duration,
    max_concurrency: usize,
}

impl HealthAggregator {
    /// Create an aggregator with default timeout and concurrency cap.
    pub fn new(directory: Arc<ServerDirectory>, client: BackendClient) -> Self {
        Self {
            directory,
            client,
            timeout: DEFAULT_HEALTH_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }

    /// Set the per-probe timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the number of probes allowed in flight. Zero is treated as one.
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Per-probe timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Probe one server.
    pub async fn check_one(&self, record: &ServerRecord, timeout: Duration) -> HealthRecord {
        check_one(&self.client, record, timeout).await
    }

    /// Probe every server in the directory and build one report.
    pub async fn check_all(&self) -> AggregateHealthReport {
        let records = self.directory.all();
        let semaphore = Arc::new(Semaphore::new(self.max_concurrency));

        // Dropping the set aborts whatever is still running
        let mut tasks = JoinSet::new();
        let mut slots = HashMap::with_capacity(records.len());
        for (index, record) in records.iter().cloned().enumerate() {
            let client = self.client.clone();
            let semaphore = Arc::clone(&semaphore);
            let timeout = self.timeout;
            let handle = tasks.spawn(async move {
                // Never closed
                let _permit = semaphore.acquire_owned().await.ok();
                check_one(&client, &record, timeout).await
            });
            slots.insert(handle.id(), index);
        }

        let mut results: Vec<Option<HealthRecord>> = vec![None; records.len()];
        while let Some(joined) = tasks.join_next_with_id().await {
            match joined {
                Ok((id, result)) => {
                    if let Some(&index) = slots.get(&id) {
                        results[index] = Some(result);
                    }
                }
                Err(e) => {
                    if let Some(&index) = slots.get(&e.id()) {
                        let name = &records[index].name;
                        warn!(server = %name, error = %e, "health probe task failed");
                        results[index] =
                            Some(HealthRecord::unreachable(name, format!("health probe failed: {e}")));
                    }
                }
            }
        }
        let results = records
            .iter()
            .zip(results)
            .map(|(record, result)| {
                result.unwrap_or_else(|| {
                    HealthRecord::unreachable(&record.name, "health check did not finish")
                })
            })
            .collect();

        let report = AggregateHealthReport::from_records(results);
        info!(
            total = report.total,
            healthy = report.healthy_count,
            unhealthy = report.unhealthy_count,
            "health check complete"
        );
        report
    }

    /// Run [`check_all`](Self::check_all) every `interval`, pushing each
    /// report into `history`. The first check runs immediately.
    pub fn spawn_monitor(&self, interval: Duration, history: Arc<HealthHistory>) -> BackgroundTask {
        let aggregator = self.clone();
        BackgroundTask::spawn("health-monitor", move |signal| {
            aggregator.run_monitor(interval, history, signal)
        })
    }

    async fn run_monitor(
        self,
        interval: Duration,
        history: Arc<HealthHistory>,
        mut signal: ShutdownSignal,
    ) {
        loop {
            let report = tokio::select! {
                report = self.check_all() => report,
                _ = signal.wait() => break,
            };
            history.push(report);
            if !signal.sleep(interval).await {
                break;
            }
        }
    }
}

async fn check_one(client: &BackendClient, record: &ServerRecord, timeout: Duration) -> HealthRecord {
    match client.probe_health(&record.endpoint, timeout).await {
        Ok(probe) if probe.status == 200 => match probe.payload {
            Some(_) => {
                debug!(server = %record.name, elapsed_ms = probe.elapsed_ms(), "healthy");
                HealthRecord::healthy(&record.name, probe.elapsed_ms())
            }
            None => {
                warn!(server = %record.name, "health endpoint returned an unparseable body");
                HealthRecord::unhealthy(
                    &record.name,
                    Some(probe.elapsed_ms()),
                    "invalid health payload",
                )
            }
        },
        Ok(probe) => {
            warn!(server = %record.name, status = probe.status, "unhealthy");
            HealthRecord::unhealthy(
                &record.name,
                Some(probe.elapsed_ms()),
                format!("HTTP {}", probe.status),
            )
        }
        Err(e) => {
            warn!(server = %record.name, error = %e, "unreachable");
            HealthRecord::unreachable(&record.name, e.to_string())
        }
    }
}

// ============================================================================
// HealthHistory
// ============================================================================

/// Bounded ring of recent reports, oldest first.
#[derive(Debug)]
pub struct HealthHistory {
    capacity: usize,
    reports: Mutex<VecDeque<AggregateHealthReport>>,
}

impl HealthHistory {
    /// Create a ring holding at most `capacity` reports (at least one).
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            reports: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Append a report, evicting the oldest when full.
    pub fn push(&self, report: AggregateHealthReport) {
        let mut reports = self.lock();
        if reports.len() == self.capacity {
            reports.pop_front();
        }
        reports.push_back(report);
    }

    /// Copy of every stored report, oldest first.
    pub fn reports(&self) -> Vec<AggregateHealthReport> {
        self.lock().iter().cloned().collect()
    }

    /// Most recent report.
    pub fn latest(&self) -> Option<AggregateHealthReport> {
        self.lock().back().cloned()
    }

    /// Number of stored reports.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether no report has been stored yet.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Maximum number of stored reports.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AggregateHealthReport>> {
        self.reports
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for HealthHistory {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_SIZE)
    }
}

// ============================================================================
// Tests
// ============================================================================
