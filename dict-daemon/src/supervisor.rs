//! Background worker supervision.
//!
//! Each worker loops *run once, then wait* where the wait ends on whichever
//! comes first: the worker's interval, a wake-up, or the supervisor's stop
//! token. A failing run is logged and the worker keeps going.
//!
//! Workers only ever see a child of the stop token, so stopping is
//! reserved to [`Supervisor::stop_all`]. Stopping is cooperative: a run in
//! progress is never interrupted, only the wait that follows it.

use crate::error::DaemonError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// A unit of recurring background work.
#[async_trait]
pub trait Worker: Send + 'static {
    /// Name used in logs and for [`Supervisor::wake`].
    fn name(&self) -> &str;

    /// Perform one unit of work.
    async fn run(&mut self) -> Result<(), DaemonError>;

    /// Called once after the stop token fires.
    async fn on_stop(&mut self) {}
}

/// Handle to a spawned worker.
#[derive(Debug)]
pub struct WorkerHandle {
    name: String,
    wake: Arc<Notify>,
    join: JoinHandle<()>,
}

impl WorkerHandle {
    /// Worker name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Cut the worker's current wait short.
    ///
    /// If the worker is busy the permit is kept and its next wait returns
    /// immediately. Repeated wakes do not accumulate beyond one permit.
    pub fn wake(&self) {
        self.wake.notify_one();
    }

    /// Whether the worker task has exited.
    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}

/// Outcome of [`Supervisor::shutdown`].
#[derive(Debug, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Workers that acknowledged the stop within the grace period.
    pub stopped: Vec<String>,
    /// Workers that panicked.
    pub panicked: Vec<String>,
    /// Workers still busy after the grace period, aborted.
    pub aborted: Vec<String>,
}

impl ShutdownReport {
    /// True when every worker stopped cleanly.
    pub fn is_clean(&self) -> bool {
        self.panicked.is_empty() && self.aborted.is_empty()
    }
}

/// Owns background workers and their shared stop token.
#[derive(Debug, Default)]
pub struct Supervisor {
    stop: CancellationToken,
    workers: Vec<WorkerHandle>,
}

impl Supervisor {
    /// Create a supervisor with no workers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `worker`, repeating every `interval` until stopped.
    pub fn spawn<W: Worker>(&mut self, worker: W, interval: Duration) -> &WorkerHandle {
        let name = worker.name().to_string();
        let wake = Arc::new(Notify::new());
        let join = tokio::spawn(worker_loop(
            worker,
            interval,
            self.stop.child_token(),
            Arc::clone(&wake),
        ));

        tracing::debug!("Spawned worker {} (interval: {:?})", name, interval);
        self.workers.push(WorkerHandle { name, wake, join });
        &self.workers[self.workers.len() - 1]
    }

    /// Wake the named worker. Returns false if no such worker exists.
    pub fn wake(&self, name: &str) -> bool {
        match self.workers.iter().find(|w| w.name == name) {
            Some(worker) => {
                worker.wake();
                true
            }
            None => false,
        }
    }

    /// Signal every worker to stop and wake each one once.
    ///
    /// Idempotent and non-blocking.
    pub fn stop_all(&self) {
        self.stop.cancel();
        for worker in &self.workers {
            worker.wake();
        }
    }

    /// Whether `stop_all` has been called.
    pub fn is_stopping(&self) -> bool {
        self.stop.is_cancelled()
    }

    /// Number of workers still owned.
    pub fn len(&self) -> usize {
        self.workers.len()
    }

    /// True when no workers are owned.
    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// Stop all workers and wait for each, bounded by `grace`.
    ///
    /// Workers that do not finish in time are aborted.
    pub async fn shutdown(&mut self, grace: Duration) -> ShutdownReport {
        self.stop_all();

        let mut report = ShutdownReport::default();
        for WorkerHandle { name, mut join, .. } in self.workers.drain(..) {
            match tokio::time::timeout(grace, &mut join).await {
                Ok(Ok(())) => report.stopped.push(name),
                Ok(Err(e)) => {
                    tracing::error!("Worker {} panicked: {}", name, e);
                    report.panicked.push(name);
                }
                Err(_) => {
                    tracing::warn!("Worker {} did not stop within {:?}, aborting", name, grace);
                    join.abort();
                    report.aborted.push(name);
                }
            }
        }
        report
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        self.stop_all();
    }
}

async fn worker_loop<W: Worker>(
    mut worker: W,
    interval: Duration,
    stop: CancellationToken,
    wake: Arc<Notify>,
) {
    let name = worker.name().to_string();

    while !stop.is_cancelled() {
        if let Err(e) = worker.run().await {
            tracing::warn!("Worker {} run failed: {}", name, e);
        }

        tokio::select! {
            _ = stop.cancelled() => {}
            _ = wake.notified() => {}
            _ = tokio::time::sleep(interval) => {}
        }
    }

    worker.on_stop().await;
    tracing::debug!("Worker {} stopped", name);
}
