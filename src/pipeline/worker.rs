//! Stage Worker - simulates the first network hop of one packet
//!
//! A worker owns exactly one packet id. It registers the packet, encodes its
//! payload, waits out a simulated latency, posts to the ingestion endpoint and
//! records the outcome. Failures only ever touch the worker's own packet.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::state::PipelineStore;
use crate::transport::{Transport, TransportError};
use crate::types::{PacketRecord, PayloadError, Point, Rgba, SensorPayload, Stage};

/// Everything a worker needs, decided by the scheduler before spawning.
#[derive(Debug, Clone)]
pub struct PacketSpec {
    pub id: String,
    pub payload: SensorPayload,
    pub endpoint: &'static str,
    pub origin: Point,
    pub ingestion: Point,
    pub color: Rgba,
    pub latency: Duration,
    /// Run epoch the batch belongs to
    pub run: u64,
}

/// How a worker finished when nothing went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Ingestion accepted the payload; the packet is `ArrivedAtIngestion`
    Delivered { status: u16 },
    /// A newer run replaced the map before this worker could write
    Stale,
}

/// Per-packet failures. The packet is already in `Error` when one of these is
/// returned.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("payload serialization failed: {0}")]
    Serialization(#[from] PayloadError),
    #[error(transparent)]
    Transport(#[from] TransportError),
}

pub struct StageWorker {
    store: PipelineStore,
    transport: Arc<dyn Transport>,
    spec: PacketSpec,
}

impl StageWorker {
    pub fn new(store: PipelineStore, transport: Arc<dyn Transport>, spec: PacketSpec) -> Self {
        Self {
            store,
            transport,
            spec,
        }
    }

    pub async fn run(self) -> Result<WorkerOutcome, WorkerError> {
        let Self {
            store,
            transport,
            spec,
        } = self;
        let run = spec.run;
        let id = spec.id.clone();

        let record = PacketRecord::new(
            spec.id,
            spec.payload.clone(),
            spec.origin,
            spec.ingestion,
            spec.color,
            run,
        );
        if !store.with(|state| state.insert_packet(record)) {
            debug!(id = %id, run, "[Worker] run replaced before insert, dropping packet");
            return Ok(WorkerOutcome::Stale);
        }

        let body = match spec.payload.encode() {
            Ok(body) => body,
            Err(e) => {
                store.with(|state| state.fail_packet(run, &id));
                return Err(e.into());
            }
        };

        tokio::time::sleep(spec.latency).await;

        let result = transport
            .post(spec.endpoint, body)
            .await
            .and_then(TransportError::check_status);

        let delivered = result.is_ok();
        let recorded = store.with(|state| {
            if delivered {
                state.transition_packet(run, &id, Stage::ArrivedAtIngestion)
            } else {
                state.fail_packet(run, &id)
            }
        });
        if !recorded {
            debug!(id = %id, run, "[Worker] packet no longer live, outcome dropped");
            return Ok(WorkerOutcome::Stale);
        }

        match result {
            Ok(status) => {
                debug!(id = %id, status, transport = transport.name(), "[Worker] delivered to ingestion");
                Ok(WorkerOutcome::Delivered { status })
            }
            Err(e) => {
                warn!(id = %id, endpoint = spec.endpoint, "[Worker] {}", e);
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{StubResponse, StubTransport};
    use crate::types::{DistanceReading, RunMode, SensorKind};

    fn spec(run: u64, distance_m: f64) -> PacketSpec {
        let kind = SensorKind::TfLuna;
        PacketSpec {
            id: kind.packet_id(1),
            payload: SensorPayload::Distance(DistanceReading {
                project_id: 1,
                distance_cm: 200,
                distance_m,
                signal_strength: 5200,
                temperature_c: 51.0,
                event: true,
                timestamp: String::new(),
            }),
            endpoint: kind.endpoint(),
            origin: Point::new(80.0, 180.0),
            ingestion: Point::new(250.0, 200.0),
            color: kind.color(),
            latency: Duration::from_millis(1),
            run,
        }
    }

    #[tokio::test]
    async fn test_success_marks_arrived() {
        let store = PipelineStore::new(15.0);
        let (_, run) = store.begin_run(RunMode::SingleBatch).unwrap();
        let worker = StageWorker::new(store.clone(), Arc::new(StubTransport::accepting()), spec(run, 2.0));

        let outcome = worker.run().await.unwrap();
        assert_eq!(outcome, WorkerOutcome::Delivered { status: 201 });
        let snap = store.snapshot();
        assert_eq!(snap.packet("tfluna_1").unwrap().stage, Stage::ArrivedAtIngestion);
    }

    #[tokio::test]
    async fn test_failure_status_marks_error() {
        let store = PipelineStore::new(15.0);
        let (_, run) = store.begin_run(RunMode::SingleBatch).unwrap();
        let transport = StubTransport::accepting().with_response("/tfluna/sensor", StubResponse::Status(422));
        let worker = StageWorker::new(store.clone(), Arc::new(transport), spec(run, 2.0));

        let err = worker.run().await.unwrap_err();
        assert!(matches!(err, WorkerError::Transport(TransportError::Status(422))));
        assert_eq!(store.snapshot().packet("tfluna_1").unwrap().stage, Stage::Error);
    }

    #[tokio::test]
    async fn test_refused_connection_marks_error() {
        let store = PipelineStore::new(15.0);
        let (_, run) = store.begin_run(RunMode::SingleBatch).unwrap();
        let transport = StubTransport::accepting().with_response("/tfluna/sensor", StubResponse::Refuse);
        let worker = StageWorker::new(store.clone(), Arc::new(transport), spec(run, 2.0));

        assert!(worker.run().await.is_err());
        assert_eq!(store.snapshot().failed, 1);
    }

    #[tokio::test]
    async fn test_unencodable_payload_fails_without_posting() {
        let store = PipelineStore::new(15.0);
        let (_, run) = store.begin_run(RunMode::SingleBatch).unwrap();
        let transport = Arc::new(StubTransport::accepting());
        let worker = StageWorker::new(store.clone(), transport.clone(), spec(run, f64::NAN));

        let err = worker.run().await.unwrap_err();
        assert!(matches!(err, WorkerError::Serialization(_)));
        assert!(transport.calls().is_empty());
        assert_eq!(store.snapshot().packet("tfluna_1").unwrap().stage, Stage::Error);
    }

    #[tokio::test]
    async fn test_stale_worker_does_not_touch_new_run() {
        let store = PipelineStore::new(15.0);
        let (_, old_run) = store.begin_run(RunMode::Recurring).unwrap();
        store.stop();
        store.begin_run(RunMode::Recurring).unwrap();

        let worker = StageWorker::new(store.clone(), Arc::new(StubTransport::accepting()), spec(old_run, 2.0));
        assert_eq!(worker.run().await.unwrap(), WorkerOutcome::Stale);
        assert_eq!(store.snapshot().packets.len(), 0);
    }

    #[tokio::test]
    async fn test_stale_worker_skips_encoding() {
        let store = PipelineStore::new(15.0);
        let (_, old_run) = store.begin_run(RunMode::Recurring).unwrap();
        store.stop();
        store.begin_run(RunMode::Recurring).unwrap();
        let transport = Arc::new(StubTransport::accepting());

        // Registration precedes encoding.
        let worker = StageWorker::new(store.clone(), transport.clone(), spec(old_run, f64::NAN));
        assert_eq!(worker.run().await.unwrap(), WorkerOutcome::Stale);
        assert!(transport.calls().is_empty());
    }
}
