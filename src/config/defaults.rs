//! System-wide default constants.
//!
//! Centralises the simulation's magic numbers. Grouped by subsystem for easy
//! discovery; every value can be overridden from `flowsim.toml`.

// ============================================================================
// Server
// ============================================================================

/// HTTP bind address for the command/snapshot API.
pub const SERVER_ADDR: &str = "127.0.0.1:8090";

// ============================================================================
// Transport
// ============================================================================

/// Base URL of the ingestion service the sensors POST to.
pub const INGEST_BASE_URL: &str = "http://localhost:8000";

/// HTTP client timeout for ingestion requests (ms).
pub const INGEST_TIMEOUT_MS: u64 = 5_000;

/// Lower bound of the simulated network latency before each POST (ms).
pub const LATENCY_MIN_MS: u64 = 500;

/// Upper bound (exclusive) of the simulated network latency (ms).
pub const LATENCY_MAX_MS: u64 = 1_000;

// ============================================================================
// Scheduler
// ============================================================================

/// Interval between batches in recurring mode (ms).
pub const BATCH_INTERVAL_MS: u64 = 2_000;

/// Poll period used while waiting for in-flight workers to settle (ms).
pub const IDLE_POLL_MS: u64 = 10;

/// How long shutdown waits for in-flight workers (ms).
pub const SHUTDOWN_DRAIN_MS: u64 = 2_000;

// ============================================================================
// Stage Advancer
// ============================================================================

/// Tick rate of the advancer (Hz).
pub const TICK_HZ: u32 = 60;

/// Distance a packet travels per tick (px).
pub const PACKET_SPEED: f64 = 3.0;

/// Ticks a packet spends in each processing sub-stage. 30 = 0.5 s at 60 Hz.
pub const PROCESSING_DELAY_TICKS: u32 = 30;

/// Ticks between status lines from the tick loop. 120 = 2 s at 60 Hz.
pub const STATUS_LOG_EVERY_TICKS: u64 = 120;

// ============================================================================
// Layout
// ============================================================================

/// X coordinate every packet starts from (the sensor tripod).
pub const ORIGIN_X: f64 = 80.0;

/// Per-sensor starting Y lanes.
pub const LANE_TFLUNA_Y: f64 = 180.0;
pub const LANE_MPU_Y: f64 = 200.0;
pub const LANE_IMX_Y: f64 = 220.0;

/// Service coordinates, left to right.
pub const INGESTION_POS: (f64, f64) = (250.0, 200.0);
pub const BROKER_POS: (f64, f64) = (400.0, 200.0);
pub const NOTIFIER_POS: (f64, f64) = (550.0, 200.0);
pub const FRONTEND_POS: (f64, f64) = (620.0, 180.0);

// ============================================================================
// Tilt Parameter
// ============================================================================

/// Symmetric bound of the user-adjustable tilt, in degrees.
pub const TILT_BOUND_DEG: f64 = 15.0;

/// Tilt change per key press, in degrees.
pub const TILT_STEP_DEG: f64 = 0.5;

/// Number of frames in the tripod tilt sprite sheet.
pub const TRIPOD_FRAMES: usize = 7;

// ============================================================================
// Dashboard
// ============================================================================

/// Sharpness range mapped onto the dashboard bar.
pub const SHARPNESS_BAR_MIN: f64 = 4.0;
pub const SHARPNESS_BAR_MAX: f64 = 6.0;
