//! Tick loop: invokes the [`StageAdvancer`] at a steady rate until shutdown.

use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::advancer::StageAdvancer;
use super::state::PipelineStore;

/// Counters accumulated over the loop's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub ticks: u64,
    pub completed: u64,
    pub auto_stops: u64,
}

pub struct TickLoop {
    store: PipelineStore,
    advancer: StageAdvancer,
    period: Duration,
    cancel_token: CancellationToken,
    /// Emit a status line every N ticks; 0 disables it
    status_every: u64,
}

impl TickLoop {
    pub fn new(
        store: PipelineStore,
        advancer: StageAdvancer,
        period: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            store,
            advancer,
            period,
            cancel_token,
            status_every: 0,
        }
    }

    pub fn with_status_every(mut self, ticks: u64) -> Self {
        self.status_every = ticks;
        self
    }

    /// Run until the cancellation token fires.
    pub async fn run(self) -> TickStats {
        let mut stats = TickStats::default();
        let mut interval = tokio::time::interval(self.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!("⏱️  Tick loop running every {:?}", self.period);

        loop {
            tokio::select! {
                biased;
                () = self.cancel_token.cancelled() => {
                    info!("[TickLoop] Shutdown signal received");
                    break;
                }
                _ = interval.tick() => {}
            }

            let report = self.advancer.advance(&self.store);
            stats.ticks += 1;
            stats.completed += report.completed.len() as u64;

            for id in &report.completed {
                debug!(id = %id, "[TickLoop] packet done");
            }
            if report.auto_stopped {
                stats.auto_stops += 1;
                info!("✅ Batch drained, run auto-stopped");
            }

            if self.status_every > 0 && stats.ticks % self.status_every == 0 {
                let snap = self.store.snapshot();
                if snap.running {
                    info!(
                        "[TickLoop] run {} | batches {} | packets {} | done {} | failed {}",
                        snap.run,
                        snap.sequence,
                        snap.packets.len(),
                        snap.done,
                        snap.failed
                    );
                }
            }
        }

        info!(
            "⏱️  Tick loop stopped after {} ticks ({} packets completed)",
            stats.ticks, stats.completed
        );
        stats
    }
}
