//! Randomized sensor readings for the three packet sources
//!
//! Value ranges follow the field hardware: TF-Luna distances of 1.5–3 m,
//! MPU-6050 readings around 1 g with small gyro drift, IMX477 sharpness
//! scores between 4 and 6.

use chrono::Local;
use rand::prelude::*;
use std::time::Duration;

use crate::types::{
    DistanceReading, ImageQualityReading, OrientationReading, SensorKind, SensorPayload,
    WIRE_TIMESTAMP_FORMAT,
};

/// Project every reading is filed under.
const PROJECT_ID: i64 = 1;

/// Camera capture resolution reported with every frame.
const CAMERA_RESOLUTION: &str = "640x480";

/// Frame quality reported by the camera pipeline (fixed by firmware).
const FRAME_QUALITY: f64 = 20.0;

/// Aperture opens 1.5° per degree of tripod tilt.
const APERTURE_PER_TILT: f64 = 1.5;

/// Source of payloads and simulated latencies.
pub struct SensorGenerator {
    rng: StdRng,
}

impl SensorGenerator {
    /// Seeded generator for reproducible runs; entropy-seeded when `None`.
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }

    /// Reading for `kind`. `tilt_deg` is the current tripod tilt; only the
    /// orientation sensor sees it.
    pub fn generate(&mut self, kind: SensorKind, tilt_deg: f64) -> SensorPayload {
        match kind {
            SensorKind::TfLuna => SensorPayload::Distance(self.distance()),
            SensorKind::Mpu => SensorPayload::Orientation(self.orientation(tilt_deg)),
            SensorKind::Imx477 => SensorPayload::ImageQuality(self.image_quality()),
        }
    }

    /// Uniform latency in `[min_ms, max_ms)`; exactly `min_ms` when the range
    /// is empty.
    pub fn latency(&mut self, min_ms: u64, max_ms: u64) -> Duration {
        let ms = if max_ms > min_ms {
            self.rng.gen_range(min_ms..max_ms)
        } else {
            min_ms
        };
        Duration::from_millis(ms)
    }

    fn distance(&mut self) -> DistanceReading {
        let distance_cm: i64 = self.rng.gen_range(150..300);
        DistanceReading {
            project_id: PROJECT_ID,
            distance_cm,
            distance_m: distance_cm as f64 / 100.0,
            signal_strength: self.rng.gen_range(5_000..6_000),
            temperature_c: 50.0 + self.rng.gen::<f64>() * 5.0,
            event: true,
            timestamp: now_stamp(),
        }
    }

    fn orientation(&mut self, tilt_deg: f64) -> OrientationReading {
        let rng = &mut self.rng;
        OrientationReading {
            project_id: PROJECT_ID,
            ax: 0.1 + rng.gen::<f64>() * 0.1,
            ay: -0.05 + rng.gen::<f64>() * 0.1,
            az: 9.8 + rng.gen::<f64>() * 0.1,
            gx: 0.01 + rng.gen::<f64>() * 0.02,
            gy: 0.02 + rng.gen::<f64>() * 0.02,
            gz: 0.03 + rng.gen::<f64>() * 0.02,
            roll: tilt_deg,
            pitch: 0.5 + rng.gen::<f64>(),
            aperture: tilt_deg * APERTURE_PER_TILT,
            event: true,
            timestamp: now_stamp(),
        }
    }

    fn image_quality(&mut self) -> ImageQualityReading {
        let rng = &mut self.rng;
        ImageQualityReading {
            project_id: PROJECT_ID,
            resolution: CAMERA_RESOLUTION.to_string(),
            mean_luminosity: 5.0 + rng.gen::<f64>() * 10.0,
            sharpness: 4.0 + rng.gen::<f64>() * 2.0,
            laser_detected: rng.gen_bool(0.5),
            frame_quality: FRAME_QUALITY,
            confidence: 0.8 + rng.gen::<f64>() * 0.2,
            event: true,
            timestamp: now_stamp(),
        }
    }
}

fn now_stamp() -> String {
    Local::now().format(WIRE_TIMESTAMP_FORMAT).to_string()
}
