//! API handlers: the command surface and snapshot reads.
//!
//! All handlers return `Response` via [`ApiResponse::ok`] or [`ApiErrorResponse`].

use axum::body::Bytes;
use axum::extract::State;
use axum::response::Response;
use axum::Json;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::pipeline::{PipelineScheduler, PipelineStore};
use crate::types::{DistanceReading, ImageQualityReading, OrientationReading, RunMode};

// ============================================================================
// State
// ============================================================================

/// Shared handles for every handler.
#[derive(Clone)]
pub struct ApiState {
    pub store: PipelineStore,
    pub scheduler: PipelineScheduler,
    /// Mode used when `POST /start` carries no body
    pub default_mode: RunMode,
    /// Tilt step the presentation layer applies per key press
    pub step_deg: f64,
    /// Name of the transport workers post through
    pub transport: String,
}

// ============================================================================
// Request / response types
// ============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StartRequest {
    #[serde(default)]
    pub mode: Option<RunMode>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ParameterRequest {
    pub delta: f64,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub running: bool,
    pub run: u64,
    pub transport: String,
    pub in_flight: usize,
}

#[derive(Debug, Serialize)]
pub struct ParameterResponse {
    pub tilt_deg: f64,
    pub step_deg: f64,
}

/// Parse an optional JSON body; an empty body yields `T::default()`.
fn parse_optional<T: DeserializeOwned + Default>(body: &Bytes) -> Result<T, Response> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(T::default());
    }
    serde_json::from_slice(body).map_err(|e| ApiErrorResponse::bad_request(e.to_string()))
}

// ============================================================================
// Handlers
// ============================================================================

/// GET /health
pub async fn get_health(State(state): State<ApiState>) -> Response {
    let (running, run) = state.store.with(|s| (s.is_running(), s.run()));
    ApiResponse::ok(HealthResponse {
        status: "ok",
        running,
        run,
        transport: state.transport.clone(),
        in_flight: state.scheduler.in_flight(),
    })
}

/// GET /snapshot
pub async fn get_snapshot(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.store.snapshot())
}

/// POST /start
pub async fn post_start(State(state): State<ApiState>, body: Bytes) -> Response {
    let request: StartRequest = match parse_optional(&body) {
        Ok(r) => r,
        Err(resp) => return resp,
    };
    let mode = request.mode.unwrap_or(state.default_mode);
    ApiResponse::ok(state.scheduler.start(mode))
}

/// POST /stop
pub async fn post_stop(State(state): State<ApiState>) -> Response {
    ApiResponse::ok(state.scheduler.stop())
}

/// POST /parameter
pub async fn post_parameter(State(state): State<ApiState>, body: Bytes) -> Response {
    let request: ParameterRequest = match serde_json::from_slice(&body) {
        Ok(r) => r,
        Err(e) => return ApiErrorResponse::bad_request(e.to_string()),
    };
    let tilt_deg = state.store.adjust_tilt(request.delta);
    debug!(delta = request.delta, tilt_deg, "[API] tilt adjusted");
    ApiResponse::ok(ParameterResponse {
        tilt_deg,
        step_deg: state.step_deg,
    })
}

/// Fallback for unknown paths.
pub async fn not_found() -> Response {
    ApiErrorResponse::not_found("no such endpoint")
}

// ============================================================================
// Mock ingestion
// ============================================================================
//
// Stand-ins for the external ingestion service. The `Json` extractor rejects
// bodies that do not match the reading shape with 422.

#[derive(Debug, Serialize)]
pub struct IngestAck {
    pub status: &'static str,
    pub sensor: &'static str,
}

fn created(sensor: &'static str) -> Response {
    info!("📥 [MockIngest] {} reading accepted", sensor);
    ApiResponse::created(IngestAck {
        status: "created",
        sensor,
    })
}

/// POST /tfluna/sensor
pub async fn ingest_distance(Json(reading): Json<DistanceReading>) -> Response {
    debug!(distance_m = reading.distance_m, "[MockIngest] tfluna");
    created("tfluna")
}

/// POST /mpu/sensor
pub async fn ingest_orientation(Json(reading): Json<OrientationReading>) -> Response {
    debug!(roll = reading.roll, "[MockIngest] mpu");
    created("mpu")
}

/// POST /imx477/sensor
pub async fn ingest_image_quality(Json(reading): Json<ImageQualityReading>) -> Response {
    debug!(sharpness = reading.sharpness, "[MockIngest] imx477");
    created("imx477")
}
