//! Packet Pipeline Module
//!
//! ## Packet Lifeline
//!
//! ```text
//! StageWorker (async, one per packet)
//!   SendingToIngestion --POST ok--> ArrivedAtIngestion
//!                      --fail-----> Error
//!
//! StageAdvancer (one pass per tick)
//!   ArrivedAtIngestion -> ProcessingAtIngestion -> SendingToBroker
//!   -> ProcessingAtBroker -> SendingToNotifier -> ProcessingAtNotifier
//!   -> SendingToFrontend -> Done (DashboardProjector updates aggregates)
//! ```
//!
//! The scheduler spawns workers; workers and the advancer share one
//! [`PipelineStore`] and touch it only through its lock.

mod advancer;
mod dashboard;
mod scheduler;
mod state;
mod tick_loop;
mod worker;

pub use advancer::{StageAdvancer, TickReport};
pub use dashboard::{DashboardProjector, DashboardReadings};
pub use scheduler::PipelineScheduler;
pub use state::*;
pub use tick_loop::{TickLoop, TickStats};
pub use worker::{PacketSpec, StageWorker, WorkerError, WorkerOutcome};
