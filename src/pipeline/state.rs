//! Pipeline State and Store
//!
//! Shared state for the packet pipeline, accessed by stage workers, the
//! per-tick advancer and the API. Every access goes through
//! [`PipelineStore::with`], which runs a closure while holding the store's
//! single lock.

use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use super::dashboard::{DashboardProjector, DashboardReadings};
use crate::types::{PacketRecord, RunMode, ServiceTimers, Stage, StartOutcome, StopOutcome};

// ============================================================================
// Pipeline State
// ============================================================================

/// Everything the workers, the advancer and the presentation layer share.
#[derive(Debug)]
pub struct PipelineState {
    pub(crate) packets: HashMap<String, PacketRecord>,
    pub(crate) timers: ServiceTimers,
    pub(crate) dashboard: DashboardReadings,
    running: bool,
    mode: RunMode,
    /// Batches spawned in the current run
    sequence: u64,
    /// Bumped by every start; stale workers compare against it
    run: u64,
    /// Tripod tilt fed into orientation readings
    tilt_deg: f64,
    tilt_bound_deg: f64,
    cancel: Option<CancellationToken>,
}

/// What a batch needs to know, captured under the lock.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BatchTicket {
    pub run: u64,
    pub sequence: u64,
    pub tilt_deg: f64,
}

impl PipelineState {
    pub fn new(tilt_bound_deg: f64) -> Self {
        Self {
            packets: HashMap::new(),
            timers: ServiceTimers::default(),
            dashboard: DashboardReadings::default(),
            running: false,
            mode: RunMode::default(),
            sequence: 0,
            run: 0,
            tilt_deg: 0.0,
            tilt_bound_deg: tilt_bound_deg.abs(),
            cancel: None,
        }
    }

    // === Run lifecycle ===

    /// Reset the map, aggregates and timers and mark a new run as started.
    ///
    /// Returns the run's cancellation token and epoch, or `None` when a run
    /// is already in progress.
    pub fn begin_run(&mut self, mode: RunMode) -> Option<(CancellationToken, u64)> {
        if self.running {
            return None;
        }
        self.packets.clear();
        self.timers = ServiceTimers::default();
        self.dashboard = DashboardReadings::default();
        self.sequence = 0;
        self.run += 1;
        self.mode = mode;
        self.running = true;

        let token = CancellationToken::new();
        self.cancel = Some(token.clone());
        Some((token, self.run))
    }

    /// Clear `running` and fire the cancellation token. Idempotent: the token
    /// is fired at most once per run.
    pub fn stop(&mut self) -> StopOutcome {
        let token = self.cancel.take();
        if !self.running && token.is_none() {
            return StopOutcome::AlreadyStopped;
        }
        self.running = false;
        if let Some(token) = token {
            token.cancel();
        }
        StopOutcome::Stopped
    }

    /// Claim the next batch of `run`, or `None` if that run is no longer the
    /// live one.
    pub fn next_batch(&mut self, run: u64) -> Option<BatchTicket> {
        if !self.running || run != self.run {
            return None;
        }
        self.sequence += 1;
        Some(BatchTicket {
            run,
            sequence: self.sequence,
            tilt_deg: self.tilt_deg,
        })
    }

    // === Packet access ===

    /// Insert a record created by a worker of `record.run`. Refused when the
    /// map already moved on to a newer run.
    pub fn insert_packet(&mut self, record: PacketRecord) -> bool {
        if record.run != self.run {
            return false;
        }
        self.packets.insert(record.id.clone(), record);
        true
    }

    /// Apply a stage transition to one packet of run `run`.
    ///
    /// Returns false when the packet is gone, belongs to another run, or the
    /// transition is not allowed from its current stage.
    pub fn transition_packet(&mut self, run: u64, id: &str, next: Stage) -> bool {
        if run != self.run {
            return false;
        }
        self.packets
            .get_mut(id)
            .is_some_and(|record| record.transition(next))
    }

    /// Move one packet of run `run` to `Error`; see [`PacketRecord::fail`].
    pub fn fail_packet(&mut self, run: u64, id: &str) -> bool {
        if run != self.run {
            return false;
        }
        self.packets.get_mut(id).is_some_and(PacketRecord::fail)
    }

    pub fn packet(&self, id: &str) -> Option<&PacketRecord> {
        self.packets.get(id)
    }

    pub fn packet_count(&self) -> usize {
        self.packets.len()
    }

    /// True when at least one packet exists and every packet is terminal.
    pub fn all_terminal(&self) -> bool {
        !self.packets.is_empty() && self.packets.values().all(PacketRecord::is_terminal)
    }

    // === Tilt parameter ===

    /// Shift the tilt by `delta`, clamped to the configured bound. Non-finite
    /// deltas are ignored. Returns the resulting tilt.
    pub fn adjust_tilt(&mut self, delta: f64) -> f64 {
        if delta.is_finite() {
            self.tilt_deg = (self.tilt_deg + delta).clamp(-self.tilt_bound_deg, self.tilt_bound_deg);
        }
        self.tilt_deg
    }

    // === Accessors ===

    pub const fn is_running(&self) -> bool {
        self.running
    }

    pub const fn mode(&self) -> RunMode {
        self.mode
    }

    pub const fn sequence(&self) -> u64 {
        self.sequence
    }

    pub const fn run(&self) -> u64 {
        self.run
    }

    pub const fn timers(&self) -> ServiceTimers {
        self.timers
    }

    pub const fn dashboard(&self) -> DashboardReadings {
        self.dashboard
    }

    /// Copy everything the presentation layer draws.
    pub fn snapshot(&self) -> PipelineSnapshot {
        let mut packets: Vec<PacketView> = self
            .packets
            .values()
            .map(|record| PacketView {
                label: record.source.label(),
                error: record.has_error(),
                record: record.clone(),
            })
            .collect();
        packets.sort_by(|a, b| a.record.id.cmp(&b.record.id));

        let done = packets.iter().filter(|p| p.record.stage == Stage::Done).count();
        let failed = packets.iter().filter(|p| p.error).count();

        PipelineSnapshot {
            running: self.running,
            mode: self.mode,
            run: self.run,
            sequence: self.sequence,
            tilt_deg: self.tilt_deg,
            tripod_frame: DashboardProjector::tripod_frame(self.tilt_deg, self.tilt_bound_deg),
            timers: self.timers,
            dashboard: self.dashboard,
            sharpness_fill: self.dashboard.sharpness.map(DashboardProjector::sharpness_fill),
            done,
            failed,
            packets,
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// One packet as the renderer sees it.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PacketView {
    /// Short label drawn above the packet
    pub label: &'static str,
    /// Draw the error indicator
    pub error: bool,
    #[serde(flatten)]
    pub record: PacketRecord,
}

/// Read-only copy of the pipeline, safe to hold after the lock is released.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineSnapshot {
    pub running: bool,
    pub mode: RunMode,
    pub run: u64,
    pub sequence: u64,
    pub tilt_deg: f64,
    pub tripod_frame: usize,
    pub timers: ServiceTimers,
    pub dashboard: DashboardReadings,
    pub sharpness_fill: Option<f64>,
    pub done: usize,
    pub failed: usize,
    /// Sorted by packet id
    pub packets: Vec<PacketView>,
}

impl PipelineSnapshot {
    pub fn packet(&self, id: &str) -> Option<&PacketRecord> {
        self.packets
            .iter()
            .map(|p| &p.record)
            .find(|record| record.id == id)
    }
}

// ============================================================================
// Store Handle
// ============================================================================

/// Cloneable handle to the one [`PipelineState`] of a process.
///
/// Constructed once and passed explicitly to the scheduler, the tick loop and
/// the API.
#[derive(Debug, Clone)]
pub struct PipelineStore {
    inner: Arc<Mutex<PipelineState>>,
}

impl PipelineStore {
    pub fn new(tilt_bound_deg: f64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(PipelineState::new(tilt_bound_deg))),
        }
    }

    /// Run `f` with exclusive access to the state. The lock is released when
    /// `f` returns or unwinds; never hold it across an `.await`.
    pub fn with<R>(&self, f: impl FnOnce(&mut PipelineState) -> R) -> R {
        let mut guard = self.lock();
        f(&mut guard)
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        self.with(|state| state.snapshot())
    }

    pub fn is_running(&self) -> bool {
        self.with(|state| state.is_running())
    }

    pub fn adjust_tilt(&self, delta: f64) -> f64 {
        self.with(|state| state.adjust_tilt(delta))
    }

    pub fn stop(&self) -> StopOutcome {
        self.with(PipelineState::stop)
    }

    /// Begin a run; see [`PipelineState::begin_run`].
    pub fn begin_run(&self, mode: RunMode) -> Result<(CancellationToken, u64), StartOutcome> {
        self.with(|state| state.begin_run(mode))
            .ok_or(StartOutcome::AlreadyRunning)
    }

    fn lock(&self) -> MutexGuard<'_, PipelineState> {
        self.inner.lock().unwrap_or_else(|e| {
            warn!("PipelineState mutex poisoned, recovering");
            e.into_inner()
        })
    }
}
