//! Packet records and the stage machine they move through.

use serde::{Deserialize, Serialize};

use super::{Rgba, SensorKind, SensorPayload};

// ============================================================================
// Geometry
// ============================================================================

/// Continuous 2D render coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

// ============================================================================
// Stage Machine
// ============================================================================

/// Pipeline stage of a packet.
///
/// Variants are declared in pipeline order; `Error` sorts last so the derived
/// ordering doubles as the "never regress" check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    SendingToIngestion,
    ArrivedAtIngestion,
    ProcessingAtIngestion,
    SendingToBroker,
    ProcessingAtBroker,
    SendingToNotifier,
    ProcessingAtNotifier,
    SendingToFrontend,
    Done,
    Error,
}

impl Stage {
    /// Successor on the success path. Terminal stages have none.
    pub const fn next(self) -> Option<Self> {
        match self {
            Self::SendingToIngestion => Some(Self::ArrivedAtIngestion),
            Self::ArrivedAtIngestion => Some(Self::ProcessingAtIngestion),
            Self::ProcessingAtIngestion => Some(Self::SendingToBroker),
            Self::SendingToBroker => Some(Self::ProcessingAtBroker),
            Self::ProcessingAtBroker => Some(Self::SendingToNotifier),
            Self::SendingToNotifier => Some(Self::ProcessingAtNotifier),
            Self::ProcessingAtNotifier => Some(Self::SendingToFrontend),
            Self::SendingToFrontend => Some(Self::Done),
            Self::Done | Self::Error => None,
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Error)
    }

    /// Service a `ProcessingAt*` stage is waiting on.
    pub const fn processing_service(self) -> Option<Service> {
        match self {
            Self::ProcessingAtIngestion => Some(Service::Ingestion),
            Self::ProcessingAtBroker => Some(Service::Broker),
            Self::ProcessingAtNotifier => Some(Service::Notifier),
            _ => None,
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::SendingToIngestion => "Sending → Ingestion",
            Self::ArrivedAtIngestion => "Arrived @ Ingestion",
            Self::ProcessingAtIngestion => "Processing @ Ingestion",
            Self::SendingToBroker => "Sending → Broker",
            Self::ProcessingAtBroker => "Processing @ Broker",
            Self::SendingToNotifier => "Sending → Notifier",
            Self::ProcessingAtNotifier => "Processing @ Notifier",
            Self::SendingToFrontend => "Sending → Frontend",
            Self::Done => "Done",
            Self::Error => "Error",
        };
        f.write_str(s)
    }
}

/// Intermediate services a packet is processed by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Service {
    Ingestion,
    Broker,
    Notifier,
}

/// Per-service activity countdowns driving idle/active feedback.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceTimers {
    pub ingestion: u32,
    pub broker: u32,
    pub notifier: u32,
}

impl ServiceTimers {
    /// Decrement every running timer by one tick.
    pub fn tick(&mut self) {
        self.ingestion = self.ingestion.saturating_sub(1);
        self.broker = self.broker.saturating_sub(1);
        self.notifier = self.notifier.saturating_sub(1);
    }

    pub fn start(&mut self, service: Service, ticks: u32) {
        *self.slot(service) = ticks;
    }

    pub const fn get(&self, service: Service) -> u32 {
        match service {
            Service::Ingestion => self.ingestion,
            Service::Broker => self.broker,
            Service::Notifier => self.notifier,
        }
    }

    fn slot(&mut self, service: Service) -> &mut u32 {
        match service {
            Service::Ingestion => &mut self.ingestion,
            Service::Broker => &mut self.broker,
            Service::Notifier => &mut self.notifier,
        }
    }
}

// ============================================================================
// Packet Record
// ============================================================================

/// Outcome of one movement step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Movement {
    /// Moved one step, still short of the target.
    Moved,
    /// Snapped onto the target this step (or was already there).
    Arrived,
}

/// One in-flight unit of work.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PacketRecord {
    /// `<source>_<sequence>`, stable for the packet's lifetime
    pub id: String,
    pub source: SensorKind,
    /// Rendered while true; cleared exactly when the packet reaches `Done`
    pub active: bool,
    pub position: Point,
    pub target: Point,
    pub color: Rgba,
    pub stage: Stage,
    pub payload: SensorPayload,
    /// Ticks left in the current processing sub-stage
    pub stage_timer: u32,
    /// Run epoch that created this record
    pub run: u64,
}

impl PacketRecord {
    /// Fresh record heading from `origin` to the ingestion service.
    pub fn new(
        id: String,
        payload: SensorPayload,
        origin: Point,
        ingestion: Point,
        color: Rgba,
        run: u64,
    ) -> Self {
        Self {
            id,
            source: payload.kind(),
            active: true,
            position: origin,
            target: ingestion,
            color,
            stage: Stage::SendingToIngestion,
            payload,
            stage_timer: 0,
            run,
        }
    }

    pub const fn is_terminal(&self) -> bool {
        self.stage.is_terminal()
    }

    /// Whether the renderer should flag this packet as failed.
    pub fn has_error(&self) -> bool {
        self.stage == Stage::Error
    }

    pub fn at_target(&self) -> bool {
        self.position == self.target
    }

    /// Move `step` units toward the target, snapping exactly onto it once the
    /// remaining distance is within one step.
    pub fn step_toward_target(&mut self, step: f64) -> Movement {
        let dx = self.target.x - self.position.x;
        let dy = self.target.y - self.position.y;
        let distance = dx.hypot(dy);

        if distance > step {
            self.position.x += dx / distance * step;
            self.position.y += dy / distance * step;
            Movement::Moved
        } else {
            self.position = self.target;
            Movement::Arrived
        }
    }

    /// Move to `next` if it is the immediate successor of the current stage,
    /// or `Error` from any non-terminal stage. Returns false (and leaves the
    /// record untouched) for any other transition.
    pub fn transition(&mut self, next: Stage) -> bool {
        let allowed = match next {
            Stage::Error => !self.stage.is_terminal(),
            _ => self.stage.next() == Some(next),
        };
        if !allowed {
            return false;
        }
        self.stage = next;
        if next == Stage::Done {
            self.active = false;
        }
        true
    }

    /// Freeze the packet in `Error`. False if it already finished.
    pub fn fail(&mut self) -> bool {
        self.transition(Stage::Error)
    }
}
