//! Sensor payloads carried by packets.
//!
//! The ingestion service expects the field names used by the sensor
//! firmware, so every reading keeps those names on the wire via
//! `#[serde(rename)]` while exposing English names in Rust.

use serde::{Deserialize, Serialize};

use super::SensorKind;

/// Timestamp layout the ingestion service parses.
pub const WIRE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// TF-Luna distance reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceReading {
    #[serde(rename = "id_project")]
    pub project_id: i64,
    #[serde(rename = "distancia_cm")]
    pub distance_cm: i64,
    #[serde(rename = "distancia_m")]
    pub distance_m: f64,
    #[serde(rename = "fuerza_senal")]
    pub signal_strength: i64,
    #[serde(rename = "temperatura")]
    pub temperature_c: f64,
    pub event: bool,
    pub timestamp: String,
}

/// MPU-6050 orientation reading (accelerometer, gyro, derived angles).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrientationReading {
    #[serde(rename = "id_project")]
    pub project_id: i64,
    pub ax: f64,
    pub ay: f64,
    pub az: f64,
    pub gx: f64,
    pub gy: f64,
    pub gz: f64,
    pub roll: f64,
    pub pitch: f64,
    #[serde(rename = "apertura")]
    pub aperture: f64,
    pub event: bool,
    pub timestamp: String,
}

/// IMX477 frame-quality reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageQualityReading {
    #[serde(rename = "id_project")]
    pub project_id: i64,
    pub resolution: String,
    #[serde(rename = "luminosidad_promedio")]
    pub mean_luminosity: f64,
    #[serde(rename = "nitidez_score")]
    pub sharpness: f64,
    #[serde(rename = "laser_detectado")]
    pub laser_detected: bool,
    #[serde(rename = "calidad_frame")]
    pub frame_quality: f64,
    #[serde(rename = "probabilidad_confiabilidad")]
    pub confidence: f64,
    pub event: bool,
    pub timestamp: String,
}

/// Payload encoding failures.
#[derive(Debug, thiserror::Error)]
pub enum PayloadError {
    /// JSON has no representation for NaN or infinities.
    #[error("field '{field}' is not a finite number")]
    NonFinite { field: &'static str },
    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),
}

/// A sensor reading, one variant per sensor kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "reading", rename_all = "snake_case")]
pub enum SensorPayload {
    Distance(DistanceReading),
    Orientation(OrientationReading),
    ImageQuality(ImageQualityReading),
}

impl SensorPayload {
    /// Sensor that produces this payload shape.
    pub const fn kind(&self) -> SensorKind {
        match self {
            Self::Distance(_) => SensorKind::TfLuna,
            Self::Orientation(_) => SensorKind::Mpu,
            Self::ImageQuality(_) => SensorKind::Imx477,
        }
    }

    /// Encode the bare reading as the JSON body POSTed to ingestion.
    ///
    /// `serde_json` silently writes non-finite floats as `null`; those are
    /// rejected here instead so a corrupt reading never reaches the wire.
    pub fn encode(&self) -> Result<Vec<u8>, PayloadError> {
        self.check_finite()?;
        let body = match self {
            Self::Distance(r) => serde_json::to_vec(r)?,
            Self::Orientation(r) => serde_json::to_vec(r)?,
            Self::ImageQuality(r) => serde_json::to_vec(r)?,
        };
        Ok(body)
    }

    fn check_finite(&self) -> Result<(), PayloadError> {
        let fields: Vec<(&'static str, f64)> = match self {
            Self::Distance(r) => vec![
                ("distancia_m", r.distance_m),
                ("temperatura", r.temperature_c),
            ],
            Self::Orientation(r) => vec![
                ("ax", r.ax),
                ("ay", r.ay),
                ("az", r.az),
                ("gx", r.gx),
                ("gy", r.gy),
                ("gz", r.gz),
                ("roll", r.roll),
                ("pitch", r.pitch),
                ("apertura", r.aperture),
            ],
            Self::ImageQuality(r) => vec![
                ("luminosidad_promedio", r.mean_luminosity),
                ("nitidez_score", r.sharpness),
                ("calidad_frame", r.frame_quality),
                ("probabilidad_confiabilidad", r.confidence),
            ],
        };
        match fields.into_iter().find(|(_, v)| !v.is_finite()) {
            Some((field, _)) => Err(PayloadError::NonFinite { field }),
            None => Ok(()),
        }
    }
}
