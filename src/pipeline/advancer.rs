//! Stage Advancer - the per-tick pipeline state machine
//!
//! Runs on the single tick path. Holding the store lock for one pass, it:
//!
//! 1. Ticks every service activity timer down by one
//! 2. Moves each non-terminal packet one step toward its target
//! 3. Applies the stage transition rule to packets sitting on their target
//! 4. Auto-stops a single-batch run once every packet is terminal
//!
//! The advancer performs no I/O and never fails.

use tracing::debug;

use super::dashboard::DashboardProjector;
use super::state::{PipelineState, PipelineStore};
use crate::config::{AdvancerConfig, LayoutConfig};
use crate::types::{Movement, PacketRecord, RunMode, ServiceTimers, Stage};

/// What one tick changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Packets that moved or snapped this tick
    pub moved: usize,
    /// Stage transitions applied this tick
    pub transitions: usize,
    /// Ids of packets that reached `Done` this tick
    pub completed: Vec<String>,
    /// The tick cleared `running` because a single batch drained
    pub auto_stopped: bool,
}

/// Drives packets from `ArrivedAtIngestion` to `Done`.
#[derive(Debug, Clone)]
pub struct StageAdvancer {
    step: f64,
    processing_delay: u32,
    layout: LayoutConfig,
}

impl StageAdvancer {
    pub fn new(config: &AdvancerConfig, layout: LayoutConfig) -> Self {
        Self {
            step: config.packet_speed,
            processing_delay: config.processing_delay_ticks,
            layout,
        }
    }

    /// Advance the store by one tick.
    pub fn advance(&self, store: &PipelineStore) -> TickReport {
        store.with(|state| self.advance_state(state))
    }

    /// Advance already-locked state by one tick.
    pub fn advance_state(&self, state: &mut PipelineState) -> TickReport {
        let mut report = TickReport::default();
        state.timers.tick();

        for record in state.packets.values_mut() {
            if record.is_terminal() {
                continue;
            }
            if !record.at_target() {
                report.moved += 1;
            }
            if record.step_toward_target(self.step) == Movement::Moved {
                continue;
            }

            let before = record.stage;
            self.on_target(record, &mut state.timers);
            if record.stage == before {
                continue;
            }

            report.transitions += 1;
            debug!(id = %record.id, from = %before, to = %record.stage, "[Advancer] stage transition");
            if record.stage == Stage::Done {
                DashboardProjector::project(&mut state.dashboard, &record.payload);
                report.completed.push(record.id.clone());
            }
        }

        if state.is_running() && state.mode() == RunMode::SingleBatch && state.all_terminal() {
            state.stop();
            report.auto_stopped = true;
        }
        report
    }

    /// Transition rule for a packet whose position equals its target.
    fn on_target(&self, record: &mut PacketRecord, timers: &mut ServiceTimers) {
        match record.stage {
            // Completed by the worker once the transport answers.
            Stage::SendingToIngestion => {}

            Stage::ArrivedAtIngestion | Stage::SendingToBroker | Stage::SendingToNotifier => {
                let Some(next) = record.stage.next() else {
                    return;
                };
                if let Some(service) = next.processing_service() {
                    timers.start(service, self.processing_delay);
                    record.stage_timer = self.processing_delay;
                    record.transition(next);
                }
            }

            Stage::ProcessingAtIngestion | Stage::ProcessingAtBroker | Stage::ProcessingAtNotifier => {
                if record.stage_timer > 0 {
                    record.stage_timer -= 1;
                    return;
                }
                let Some(next) = record.stage.next() else {
                    return;
                };
                if let Some(target) = self.layout.destination_of(next) {
                    record.target = target;
                    record.transition(next);
                }
            }

            Stage::SendingToFrontend => {
                record.transition(Stage::Done);
            }

            Stage::Done | Stage::Error => {}
        }
    }
}
