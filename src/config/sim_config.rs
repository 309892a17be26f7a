//! Simulation configuration - every tunable as an operator-editable TOML value
//!
//! Each section implements `Default` with the values in [`super::defaults`],
//! so a missing or partial file behaves exactly like the built-in setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};

use super::defaults;
use crate::types::{Point, RunMode, SensorKind, Stage};

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "FLOWSIM_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "flowsim.toml";

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration.
///
/// Load with `SimConfig::load()` which searches:
/// 1. `$FLOWSIM_CONFIG` env var
/// 2. `./flowsim.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub advancer: AdvancerConfig,

    #[serde(default)]
    pub layout: LayoutConfig,

    #[serde(default)]
    pub parameter: ParameterConfig,
}

impl SimConfig {
    /// Load configuration using the standard search order, falling back to
    /// defaults when a file is missing or invalid.
    pub fn load() -> Self {
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), "Loaded config from {}", CONFIG_ENV_VAR);
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from {}, falling back", CONFIG_ENV_VAR);
                    }
                }
            } else {
                warn!(path = %path, "{} points to non-existent file, falling back", CONFIG_ENV_VAR);
            }
        }

        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!("Loaded config from ./{}", LOCAL_CONFIG_FILE);
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./{}, using defaults", LOCAL_CONFIG_FILE);
                }
            }
        }

        info!("No {} found, using built-in defaults", LOCAL_CONFIG_FILE);
        Self::default()
    }

    /// Load and validate a specific TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self = toml::from_str(&contents)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(ConfigError::Serialize)
    }

    /// Check every section, collecting all problems before failing.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        let t = &self.transport;
        if t.latency_min_ms > t.latency_max_ms {
            errors.push(format!(
                "transport.latency_min_ms ({}) must be <= latency_max_ms ({})",
                t.latency_min_ms, t.latency_max_ms
            ));
        }
        if t.timeout_ms == 0 {
            errors.push("transport.timeout_ms must be > 0".to_string());
        }
        if t.kind == TransportKind::Http && t.base_url.trim().is_empty() {
            errors.push("transport.base_url must be set for the http transport".to_string());
        }

        if self.scheduler.batch_interval_ms == 0 {
            errors.push("scheduler.batch_interval_ms must be > 0".to_string());
        }

        let a = &self.advancer;
        if a.tick_hz == 0 {
            errors.push("advancer.tick_hz must be > 0".to_string());
        }
        if !a.packet_speed.is_finite() || a.packet_speed <= 0.0 {
            errors.push(format!(
                "advancer.packet_speed must be a positive finite number (got {})",
                a.packet_speed
            ));
        }
        if a.status_log_every_ticks == 0 {
            errors.push("advancer.status_log_every_ticks must be > 0".to_string());
        }

        let l = &self.layout;
        let points = [
            ("layout.ingestion", l.ingestion),
            ("layout.broker", l.broker),
            ("layout.notifier", l.notifier),
            ("layout.frontend", l.frontend),
        ];
        for (name, p) in points {
            if !p.x.is_finite() || !p.y.is_finite() {
                errors.push(format!("{name} must have finite coordinates"));
            }
        }
        let lanes = [l.origin_x, l.lanes.tfluna, l.lanes.mpu, l.lanes.imx477];
        if lanes.iter().any(|v| !v.is_finite()) {
            errors.push("layout origin and lanes must be finite".to_string());
        }

        let p = &self.parameter;
        if !p.bound_deg.is_finite() || p.bound_deg <= 0.0 {
            errors.push(format!(
                "parameter.bound_deg must be a positive finite number (got {})",
                p.bound_deg
            ));
        }
        if !p.step_deg.is_finite() || p.step_deg <= 0.0 {
            errors.push("parameter.step_deg must be a positive finite number".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Serialize(toml::ser::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Serialize(e) => write!(f, "Config serialization error: {}", e),
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Server
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address for the command/snapshot API
    #[serde(default = "default_server_addr")]
    pub addr: String,

    /// Also serve the three sensor ingestion endpoints, so the HTTP transport
    /// can target this process when no external ingestion API is running.
    #[serde(default)]
    pub mock_ingest: bool,
}

fn default_server_addr() -> String {
    defaults::SERVER_ADDR.to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
            mock_ingest: false,
        }
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Which transport carries the first hop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportKind {
    /// Real HTTP POSTs to `base_url`
    #[default]
    Http,
    /// In-process stub that accepts every packet
    Stub,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,

    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Simulated network latency range before each POST (ms, max exclusive)
    #[serde(default = "default_latency_min_ms")]
    pub latency_min_ms: u64,

    #[serde(default = "default_latency_max_ms")]
    pub latency_max_ms: u64,
}

fn default_base_url() -> String {
    defaults::INGEST_BASE_URL.to_string()
}
fn default_timeout_ms() -> u64 {
    defaults::INGEST_TIMEOUT_MS
}
fn default_latency_min_ms() -> u64 {
    defaults::LATENCY_MIN_MS
}
fn default_latency_max_ms() -> u64 {
    defaults::LATENCY_MAX_MS
}

impl TransportConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            base_url: default_base_url(),
            timeout_ms: default_timeout_ms(),
            latency_min_ms: default_latency_min_ms(),
            latency_max_ms: default_latency_max_ms(),
        }
    }
}

// ============================================================================
// Scheduler
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Mode used when a start command does not name one
    #[serde(default)]
    pub mode: RunMode,

    #[serde(default = "default_batch_interval_ms")]
    pub batch_interval_ms: u64,

    /// Seed for payload and latency generation (random when unset)
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_batch_interval_ms() -> u64 {
    defaults::BATCH_INTERVAL_MS
}

impl SchedulerConfig {
    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.batch_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            mode: RunMode::default(),
            batch_interval_ms: default_batch_interval_ms(),
            seed: None,
        }
    }
}

// ============================================================================
// Advancer
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvancerConfig {
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,

    /// Distance travelled per tick
    #[serde(default = "default_packet_speed")]
    pub packet_speed: f64,

    #[serde(default = "default_processing_delay_ticks")]
    pub processing_delay_ticks: u32,

    #[serde(default = "default_status_log_every_ticks")]
    pub status_log_every_ticks: u64,
}

fn default_tick_hz() -> u32 {
    defaults::TICK_HZ
}
fn default_packet_speed() -> f64 {
    defaults::PACKET_SPEED
}
fn default_processing_delay_ticks() -> u32 {
    defaults::PROCESSING_DELAY_TICKS
}
fn default_status_log_every_ticks() -> u64 {
    defaults::STATUS_LOG_EVERY_TICKS
}

impl AdvancerConfig {
    /// Wall-clock period of one tick.
    pub fn tick_period(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_hz.max(1)))
    }
}

impl Default for AdvancerConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            packet_speed: default_packet_speed(),
            processing_delay_ticks: default_processing_delay_ticks(),
            status_log_every_ticks: default_status_log_every_ticks(),
        }
    }
}

// ============================================================================
// Layout
// ============================================================================

/// Starting Y lane per sensor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneConfig {
    #[serde(default = "default_lane_tfluna")]
    pub tfluna: f64,
    #[serde(default = "default_lane_mpu")]
    pub mpu: f64,
    #[serde(default = "default_lane_imx477")]
    pub imx477: f64,
}

fn default_lane_tfluna() -> f64 {
    defaults::LANE_TFLUNA_Y
}
fn default_lane_mpu() -> f64 {
    defaults::LANE_MPU_Y
}
fn default_lane_imx477() -> f64 {
    defaults::LANE_IMX_Y
}

impl Default for LaneConfig {
    fn default() -> Self {
        Self {
            tfluna: default_lane_tfluna(),
            mpu: default_lane_mpu(),
            imx477: default_lane_imx477(),
        }
    }
}

/// Fixed coordinates of the pipeline services.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    #[serde(default = "default_origin_x")]
    pub origin_x: f64,

    #[serde(default)]
    pub lanes: LaneConfig,

    #[serde(default = "default_ingestion")]
    pub ingestion: Point,

    #[serde(default = "default_broker")]
    pub broker: Point,

    #[serde(default = "default_notifier")]
    pub notifier: Point,

    #[serde(default = "default_frontend")]
    pub frontend: Point,
}

fn default_origin_x() -> f64 {
    defaults::ORIGIN_X
}
fn default_ingestion() -> Point {
    Point::new(defaults::INGESTION_POS.0, defaults::INGESTION_POS.1)
}
fn default_broker() -> Point {
    Point::new(defaults::BROKER_POS.0, defaults::BROKER_POS.1)
}
fn default_notifier() -> Point {
    Point::new(defaults::NOTIFIER_POS.0, defaults::NOTIFIER_POS.1)
}
fn default_frontend() -> Point {
    Point::new(defaults::FRONTEND_POS.0, defaults::FRONTEND_POS.1)
}

impl LayoutConfig {
    /// Where packets from `kind` are created.
    pub const fn origin_for(&self, kind: SensorKind) -> Point {
        let y = match kind {
            SensorKind::TfLuna => self.lanes.tfluna,
            SensorKind::Mpu => self.lanes.mpu,
            SensorKind::Imx477 => self.lanes.imx477,
        };
        Point::new(self.origin_x, y)
    }

    /// Destination of a `SendingTo*` stage.
    pub const fn destination_of(&self, stage: Stage) -> Option<Point> {
        match stage {
            Stage::SendingToIngestion => Some(self.ingestion),
            Stage::SendingToBroker => Some(self.broker),
            Stage::SendingToNotifier => Some(self.notifier),
            Stage::SendingToFrontend => Some(self.frontend),
            _ => None,
        }
    }
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            origin_x: default_origin_x(),
            lanes: LaneConfig::default(),
            ingestion: default_ingestion(),
            broker: default_broker(),
            notifier: default_notifier(),
            frontend: default_frontend(),
        }
    }
}

// ============================================================================
// Tilt Parameter
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterConfig {
    /// Tilt is clamped to `[-bound_deg, bound_deg]`
    #[serde(default = "default_bound_deg")]
    pub bound_deg: f64,

    /// Change applied per key press by the presentation layer
    #[serde(default = "default_step_deg")]
    pub step_deg: f64,
}

fn default_bound_deg() -> f64 {
    defaults::TILT_BOUND_DEG
}
fn default_step_deg() -> f64 {
    defaults::TILT_STEP_DEG
}

impl Default for ParameterConfig {
    fn default() -> Self {
        Self {
            bound_deg: default_bound_deg(),
            step_deg: default_step_deg(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
