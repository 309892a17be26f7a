//! Dashboard projection: aggregate display values from completed packets.

use serde::{Deserialize, Serialize};

use crate::config::defaults::{SHARPNESS_BAR_MAX, SHARPNESS_BAR_MIN, TRIPOD_FRAMES};
use crate::types::SensorPayload;

/// Latest reading per dashboard field; `None` until a packet of that kind
/// completes in the current run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DashboardReadings {
    /// TF-Luna distance (m)
    pub distance_m: Option<f64>,
    /// MPU roll (degrees)
    pub roll_deg: Option<f64>,
    /// IMX477 sharpness score
    pub sharpness: Option<f64>,
}

/// Updates [`DashboardReadings`] when a packet reaches `Done`.
pub struct DashboardProjector;

impl DashboardProjector {
    /// Overwrite exactly the field matching the payload's variant.
    pub fn project(readings: &mut DashboardReadings, payload: &SensorPayload) {
        match payload {
            SensorPayload::Distance(d) => readings.distance_m = Some(d.distance_m),
            SensorPayload::Orientation(o) => readings.roll_deg = Some(o.roll),
            SensorPayload::ImageQuality(i) => readings.sharpness = Some(i.sharpness),
        }
    }

    /// Fill fraction of the sharpness bar, clamped to `[0, 1]`.
    pub fn sharpness_fill(sharpness: f64) -> f64 {
        ((sharpness - SHARPNESS_BAR_MIN) / (SHARPNESS_BAR_MAX - SHARPNESS_BAR_MIN)).clamp(0.0, 1.0)
    }

    /// Tripod sprite frame for a tilt within `[-bound, bound]`: frames are
    /// spread evenly, the middle one is level.
    pub fn tripod_frame(tilt_deg: f64, bound_deg: f64) -> usize {
        let last = TRIPOD_FRAMES - 1;
        if !tilt_deg.is_finite() || bound_deg <= 0.0 {
            return last / 2;
        }
        let band = 2.0 * bound_deg / last as f64;
        let index = ((tilt_deg + bound_deg) / band).round();
        (index.max(0.0) as usize).min(last)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DistanceReading, ImageQualityReading, OrientationReading};

    fn orientation(roll: f64) -> SensorPayload {
        SensorPayload::Orientation(OrientationReading {
            project_id: 1,
            ax: 0.0,
            ay: 0.0,
            az: 9.8,
            gx: 0.0,
            gy: 0.0,
            gz: 0.0,
            roll,
            pitch: 0.0,
            aperture: roll * 1.5,
            event: true,
            timestamp: String::new(),
        })
    }

    #[test]
    fn test_each_variant_updates_only_its_field() {
        let mut r = DashboardReadings::default();

        DashboardProjector::project(&mut r, &orientation(3.5));
        assert_eq!(r, DashboardReadings { roll_deg: Some(3.5), ..Default::default() });

        DashboardProjector::project(
            &mut r,
            &SensorPayload::Distance(DistanceReading {
                project_id: 1,
                distance_cm: 250,
                distance_m: 2.5,
                signal_strength: 5500,
                temperature_c: 51.0,
                event: true,
                timestamp: String::new(),
            }),
        );
        DashboardProjector::project(
            &mut r,
            &SensorPayload::ImageQuality(ImageQualityReading {
                project_id: 1,
                resolution: "640x480".to_string(),
                mean_luminosity: 7.0,
                sharpness: 4.8,
                laser_detected: false,
                frame_quality: 20.0,
                confidence: 0.9,
                event: true,
                timestamp: String::new(),
            }),
        );
        assert_eq!(r.distance_m, Some(2.5));
        assert_eq!(r.roll_deg, Some(3.5));
        assert_eq!(r.sharpness, Some(4.8));
    }

    #[test]
    fn test_last_writer_wins() {
        let mut r = DashboardReadings::default();
        DashboardProjector::project(&mut r, &orientation(1.0));
        DashboardProjector::project(&mut r, &orientation(-2.0));
        assert_eq!(r.roll_deg, Some(-2.0));
    }

    #[test]
    fn test_sharpness_fill_is_clamped() {
        assert_eq!(DashboardProjector::sharpness_fill(3.0), 0.0);
        assert_eq!(DashboardProjector::sharpness_fill(5.0), 0.5);
        assert_eq!(DashboardProjector::sharpness_fill(7.0), 1.0);
    }

    #[test]
    fn test_tripod_frames_span_tilt_range() {
        assert_eq!(DashboardProjector::tripod_frame(-15.0, 15.0), 0);
        assert_eq!(DashboardProjector::tripod_frame(-10.0, 15.0), 1);
        assert_eq!(DashboardProjector::tripod_frame(0.0, 15.0), 3);
        assert_eq!(DashboardProjector::tripod_frame(2.0, 15.0), 3);
        assert_eq!(DashboardProjector::tripod_frame(15.0, 15.0), 6);
        assert_eq!(DashboardProjector::tripod_frame(40.0, 15.0), 6);
    }
}
