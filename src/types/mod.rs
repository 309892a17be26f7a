//! Shared data structures for the packet pipeline
//!
//! - `SensorKind`: the three fixed packet sources
//! - `SensorPayload`: the reading a packet carries (one variant per source)
//! - `PacketRecord` + `Stage`: one in-flight packet and its stage machine
//! - `RunMode` and command outcomes for the run lifecycle

mod sensor;
mod payload;
mod packet;
mod run;

pub use sensor::*;
pub use payload::*;
pub use packet::*;
pub use run::*;
