//! FlowSim: concurrent packet-pipeline simulator
//!
//! Models sensor packets travelling through a chain of services:
//! sensor → ingestion API → broker → notifier → frontend.
//!
//! ## Architecture
//!
//! - **StageWorker**: async task per packet covering the real first hop
//! - **PipelineScheduler**: single-batch or recurring batch production
//! - **StageAdvancer**: per-tick state machine for the simulated later hops
//! - **PipelineStore**: the one lock-protected state shared by all of them
//! - **API**: command and snapshot surface for a presentation layer

pub mod api;
pub mod config;
pub mod pipeline;
pub mod sensors;
pub mod transport;
pub mod types;

// Re-export configuration
pub use config::SimConfig;

// Re-export pipeline components
pub use pipeline::{
    DashboardProjector, DashboardReadings, PipelineScheduler, PipelineSnapshot, PipelineState,
    PipelineStore, StageAdvancer, StageWorker, TickLoop,
};

// Re-export commonly used types
pub use types::{
    PacketRecord, Point, RunMode, SensorKind, SensorPayload, Stage, StartOutcome, StopOutcome,
};

// Re-export transports
pub use transport::{HttpTransport, StubTransport, Transport, TransportError};
