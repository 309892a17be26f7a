//! Pipeline Scheduler - starts and stops runs, spawns batches
//!
//! A batch is one [`StageWorker`] per sensor kind. Workers are spawned
//! fire-and-forget and report only through the store; the scheduler keeps an
//! in-flight counter so callers can wait for quiescence.
//!
//! In [`RunMode::Recurring`] a background task spawns a fresh batch every
//! `batch_interval` and observes the run's cancellation token between batches.
//! Workers already in flight are never aborted.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::state::PipelineStore;
use super::worker::{PacketSpec, StageWorker, WorkerOutcome};
use crate::config::defaults::IDLE_POLL_MS;
use crate::config::{LayoutConfig, SimConfig};
use crate::sensors::SensorGenerator;
use crate::transport::Transport;
use crate::types::{RunMode, SensorKind, StartOutcome, StopOutcome};

/// Cloneable handle; all clones drive the same store.
#[derive(Clone)]
pub struct PipelineScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    store: PipelineStore,
    transport: Arc<dyn Transport>,
    /// Only ever locked on its own, never while the store lock is held
    generator: Mutex<SensorGenerator>,
    batch_interval: Duration,
    latency_min_ms: u64,
    latency_max_ms: u64,
    layout: LayoutConfig,
    in_flight: Arc<AtomicUsize>,
}

impl PipelineScheduler {
    pub fn new(store: PipelineStore, transport: Arc<dyn Transport>, config: &SimConfig) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                store,
                transport,
                generator: Mutex::new(SensorGenerator::new(config.scheduler.seed)),
                batch_interval: config.scheduler.batch_interval(),
                latency_min_ms: config.transport.latency_min_ms,
                latency_max_ms: config.transport.latency_max_ms,
                layout: config.layout.clone(),
                in_flight: Arc::new(AtomicUsize::new(0)),
            }),
        }
    }

    pub fn store(&self) -> &PipelineStore {
        &self.inner.store
    }

    /// Begin a run in `mode`. Ignored while a run is in progress.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, mode: RunMode) -> StartOutcome {
        let (token, run) = match self.inner.store.begin_run(mode) {
            Ok(started) => started,
            Err(outcome) => {
                debug!("[Scheduler] start ignored, run already in progress");
                return outcome;
            }
        };

        info!("▶️  Run {} started ({})", run, mode);
        self.spawn_batch(run);

        if mode == RunMode::Recurring {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.recurring_loop(token, run).await });
        }
        StartOutcome::Started { mode, run }
    }

    /// Stop the current run. Idempotent.
    pub fn stop(&self) -> StopOutcome {
        let outcome = self.inner.store.stop();
        if outcome == StopOutcome::Stopped {
            info!("⏹️  Run stopped");
        }
        outcome
    }

    /// Workers spawned but not yet finished.
    pub fn in_flight(&self) -> usize {
        self.inner.in_flight.load(Ordering::SeqCst)
    }

    /// Poll until no worker is in flight. Returns false on timeout.
    pub async fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            if self.in_flight() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(IDLE_POLL_MS)).await;
        }
    }

    async fn recurring_loop(self, token: CancellationToken, run: u64) {
        let mut interval = tokio::time::interval(self.inner.batch_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // First tick fires immediately; `start` already spawned that batch.
        interval.tick().await;

        loop {
            tokio::select! {
                biased;
                () = token.cancelled() => {
                    debug!(run, "[Scheduler] recurring loop cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if !self.spawn_batch(run) {
                        break;
                    }
                }
            }
        }
    }

    /// Spawn one worker per sensor kind for `run`. Returns false when the run
    /// is no longer live.
    fn spawn_batch(&self, run: u64) -> bool {
        let inner = &self.inner;
        let Some(ticket) = inner.store.with(|state| state.next_batch(run)) else {
            return false;
        };
        debug!(run, sequence = ticket.sequence, "[Scheduler] spawning batch");

        let specs: Vec<PacketSpec> = {
            let mut generator = inner
                .generator
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            SensorKind::ALL
                .iter()
                .map(|&kind| PacketSpec {
                    id: kind.packet_id(ticket.sequence),
                    payload: generator.generate(kind, ticket.tilt_deg),
                    endpoint: kind.endpoint(),
                    origin: inner.layout.origin_for(kind),
                    ingestion: inner.layout.ingestion,
                    color: kind.color(),
                    latency: generator.latency(inner.latency_min_ms, inner.latency_max_ms),
                    run,
                })
                .collect()
        };

        for spec in specs {
            let worker = StageWorker::new(inner.store.clone(), Arc::clone(&inner.transport), spec);
            let guard = InFlight::enter(&inner.in_flight);
            tokio::spawn(async move {
                let _guard = guard;
                match worker.run().await {
                    Ok(WorkerOutcome::Delivered { .. } | WorkerOutcome::Stale) => {}
                    Err(e) => warn!("[Scheduler] worker failed: {}", e),
                }
            });
        }
        true
    }
}

/// Counts a worker as in flight until dropped.
struct InFlight(Arc<AtomicUsize>);

impl InFlight {
    fn enter(counter: &Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(counter))
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
