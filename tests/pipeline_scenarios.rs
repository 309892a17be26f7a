//! Pipeline Scenario Tests
//!
//! Drives scheduler, workers and advancer together against a stub transport.
//! The advancer is ticked by hand so runs are deterministic apart from worker
//! completion order. No network port is opened.

use flowsim::config::SimConfig;
use flowsim::pipeline::{
    PacketSpec, PipelineScheduler, PipelineStore, StageAdvancer, StageWorker,
};
use flowsim::transport::{StubTransport, Transport};
use flowsim::types::{RunMode, SensorKind, SensorPayload, Stage, StartOutcome, StopOutcome};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

const MAX_TICKS: usize = 5_000;

fn fast_config() -> SimConfig {
    let mut config = SimConfig::default();
    config.transport.latency_min_ms = 0;
    config.transport.latency_max_ms = 1;
    config.scheduler.seed = Some(42);
    config
}

struct Harness {
    store: PipelineStore,
    scheduler: PipelineScheduler,
    advancer: StageAdvancer,
}

impl Harness {
    fn new(config: &SimConfig, transport: Arc<dyn Transport>) -> Self {
        let store = PipelineStore::new(config.parameter.bound_deg);
        let scheduler = PipelineScheduler::new(store.clone(), transport, config);
        let advancer = StageAdvancer::new(&config.advancer, config.layout.clone());
        Self {
            store,
            scheduler,
            advancer,
        }
    }

    /// Tick until the run stops itself. Returns the number of ticks taken.
    fn tick_until_stopped(&self) -> usize {
        for tick in 1..=MAX_TICKS {
            self.advancer.advance(&self.store);
            if !self.store.is_running() {
                return tick;
            }
        }
        panic!("run did not auto-stop within {MAX_TICKS} ticks");
    }
}

/// Single batch, every endpoint accepts: all packets reach Done, the run
/// stops itself and every dashboard field carries its packet's reading.
#[tokio::test]
async fn test_single_batch_all_succeed() {
    let config = fast_config();
    let h = Harness::new(&config, Arc::new(StubTransport::accepting()));

    let outcome = h.scheduler.start(RunMode::SingleBatch);
    assert!(matches!(outcome, StartOutcome::Started { .. }));
    assert!(h.scheduler.wait_for_idle(Duration::from_secs(5)).await);

    h.tick_until_stopped();

    let snap = h.store.snapshot();
    assert!(!snap.running);
    assert_eq!(snap.packets.len(), 3);
    assert_eq!(snap.done, 3);
    assert_eq!(snap.failed, 0);

    for view in &snap.packets {
        let record = &view.record;
        assert_eq!(record.stage, Stage::Done, "{} not done", record.id);
        assert!(!record.active);
        assert_eq!(record.position, config.layout.frontend);
        match &record.payload {
            SensorPayload::Distance(d) => assert_eq!(snap.dashboard.distance_m, Some(d.distance_m)),
            SensorPayload::Orientation(o) => assert_eq!(snap.dashboard.roll_deg, Some(o.roll)),
            SensorPayload::ImageQuality(i) => assert_eq!(snap.dashboard.sharpness, Some(i.sharpness)),
        }
    }
}

/// The imaging endpoint fails: its packet ends in Error and sharpness stays
/// unset; the other two packets finish normally.
#[tokio::test]
async fn test_single_batch_imaging_failure() {
    let config = fast_config();
    let transport = StubTransport::accepting().failing_for(SensorKind::Imx477);
    let h = Harness::new(&config, Arc::new(transport));

    h.scheduler.start(RunMode::SingleBatch);
    assert!(h.scheduler.wait_for_idle(Duration::from_secs(5)).await);

    let imx_before = h.store.snapshot().packet("imx_1").unwrap().position;
    h.tick_until_stopped();

    let snap = h.store.snapshot();
    let imx = snap.packet("imx_1").unwrap();
    assert_eq!(imx.stage, Stage::Error);
    assert_eq!(imx.position, imx_before, "errored packet must stay frozen");
    assert!(snap.packets.iter().any(|p| p.record.id == "imx_1" && p.error));

    assert_eq!(snap.packet("tfluna_1").unwrap().stage, Stage::Done);
    assert_eq!(snap.packet("mpu_1").unwrap().stage, Stage::Done);
    assert!(snap.dashboard.distance_m.is_some());
    assert!(snap.dashboard.roll_deg.is_some());
    assert_eq!(snap.dashboard.sharpness, None);
    assert_eq!(snap.sharpness_fill, None);
    assert_eq!((snap.done, snap.failed), (2, 1));
}

/// Recurring run stopped before the second interval: exactly one batch ever
/// exists, even after waiting past the interval.
#[tokio::test]
async fn test_recurring_stopped_before_second_interval() {
    let mut config = fast_config();
    config.scheduler.batch_interval_ms = 300;
    let h = Harness::new(&config, Arc::new(StubTransport::accepting()));

    h.scheduler.start(RunMode::Recurring);
    assert_eq!(h.scheduler.stop(), StopOutcome::Stopped);

    tokio::time::sleep(Duration::from_millis(700)).await;
    assert!(h.scheduler.wait_for_idle(Duration::from_secs(5)).await);

    let snap = h.store.snapshot();
    assert_eq!(snap.sequence, 1);
    assert_eq!(snap.packets.len(), 3);
    assert!(!snap.running);

    // Stop does not remove what is already there.
    assert_eq!(h.scheduler.stop(), StopOutcome::AlreadyStopped);
    assert_eq!(h.store.snapshot().packets.len(), 3);
}

/// A recurring run keeps its packets flowing and never stops on its own.
#[tokio::test]
async fn test_recurring_run_survives_drained_batches() {
    let mut config = fast_config();
    config.scheduler.batch_interval_ms = 60_000;
    let h = Harness::new(&config, Arc::new(StubTransport::accepting()));

    h.scheduler.start(RunMode::Recurring);
    assert!(h.scheduler.wait_for_idle(Duration::from_secs(5)).await);
    for _ in 0..MAX_TICKS {
        h.advancer.advance(&h.store);
    }

    let snap = h.store.snapshot();
    assert_eq!(snap.done, 3);
    assert!(snap.running, "recurring runs only stop on command");
    h.scheduler.stop();
}

/// Tilt set before a batch shows up as the orientation packet's roll.
#[tokio::test]
async fn test_tilt_feeds_orientation_reading() {
    let config = fast_config();
    let h = Harness::new(&config, Arc::new(StubTransport::accepting()));
    h.store.adjust_tilt(-7.5);

    h.scheduler.start(RunMode::SingleBatch);
    assert!(h.scheduler.wait_for_idle(Duration::from_secs(5)).await);
    h.tick_until_stopped();

    let snap = h.store.snapshot();
    assert_eq!(snap.dashboard.roll_deg, Some(-7.5));
    assert_eq!(snap.tripod_frame, 2);
}

/// K workers launched at once yield K distinct, intact records.
#[tokio::test]
async fn test_concurrent_workers_produce_distinct_records() {
    const K: u64 = 60;
    let config = fast_config();
    let store = PipelineStore::new(config.parameter.bound_deg);
    let (_, run) = store.begin_run(RunMode::Recurring).unwrap();
    let transport: Arc<dyn Transport> = Arc::new(StubTransport::accepting());
    let mut generator = flowsim::sensors::SensorGenerator::new(Some(3));

    let mut handles = Vec::new();
    for seq in 1..=K {
        for kind in SensorKind::ALL {
            let spec = PacketSpec {
                id: kind.packet_id(seq),
                payload: generator.generate(kind, 0.0),
                endpoint: kind.endpoint(),
                origin: config.layout.origin_for(kind),
                ingestion: config.layout.ingestion,
                color: kind.color(),
                latency: generator.latency(0, 5),
                run,
            };
            let worker = StageWorker::new(store.clone(), Arc::clone(&transport), spec);
            handles.push(tokio::spawn(worker.run()));
        }
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let snap = store.snapshot();
    let expected = (K as usize) * SensorKind::ALL.len();
    assert_eq!(snap.packets.len(), expected);

    let ids: HashSet<_> = snap.packets.iter().map(|p| p.record.id.clone()).collect();
    assert_eq!(ids.len(), expected);

    for view in &snap.packets {
        let record = &view.record;
        assert_eq!(record.stage, Stage::ArrivedAtIngestion);
        assert_eq!(record.source, record.payload.kind());
        assert!(record.id.starts_with(record.source.id_prefix()));
        assert_eq!(record.position, config.layout.origin_for(record.source));
        assert_eq!(record.color, record.source.color());
    }
}

/// Restarting after a stop clears the previous run's packets and readings.
#[tokio::test]
async fn test_restart_resets_run_state() {
    let config = fast_config();
    let h = Harness::new(&config, Arc::new(StubTransport::accepting()));

    h.scheduler.start(RunMode::SingleBatch);
    assert!(h.scheduler.wait_for_idle(Duration::from_secs(5)).await);
    h.tick_until_stopped();
    assert!(h.store.snapshot().dashboard.distance_m.is_some());

    let outcome = h.scheduler.start(RunMode::SingleBatch);
    assert_eq!(outcome, StartOutcome::Started { mode: RunMode::SingleBatch, run: 2 });
    let snap = h.store.snapshot();
    assert_eq!(snap.dashboard.distance_m, None);
    assert!(snap.packets.iter().all(|p| p.record.run == 2));
    assert!(h.scheduler.wait_for_idle(Duration::from_secs(5)).await);
}
