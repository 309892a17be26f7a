//! Sensor kinds: the three fixed packet sources of the pipeline

use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Display tag attached to every packet of a given source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Rgba {
    pub const fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }
}

/// The three sensor sources that emit packets into the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorKind {
    /// TF-Luna LiDAR range finder (distance readings)
    TfLuna,
    /// MPU-6050 inertial unit (orientation readings)
    Mpu,
    /// IMX477 camera module (image-quality readings)
    Imx477,
}

impl SensorKind {
    /// Every sensor kind, in batch spawn order.
    pub const ALL: [Self; 3] = [Self::TfLuna, Self::Mpu, Self::Imx477];

    /// Prefix used to build packet ids (`<prefix>_<sequence>`).
    pub const fn id_prefix(self) -> &'static str {
        match self {
            Self::TfLuna => "tfluna",
            Self::Mpu => "mpu",
            Self::Imx477 => "imx",
        }
    }

    /// Ingestion endpoint path, relative to the transport base URL.
    pub const fn endpoint(self) -> &'static str {
        match self {
            Self::TfLuna => "/tfluna/sensor",
            Self::Mpu => "/mpu/sensor",
            Self::Imx477 => "/imx477/sensor",
        }
    }

    /// Short label drawn above a packet.
    pub const fn label(self) -> &'static str {
        match self {
            Self::TfLuna => "TFL",
            Self::Mpu => "MPU",
            Self::Imx477 => "IMX",
        }
    }

    pub const fn color(self) -> Rgba {
        match self {
            Self::TfLuna => Rgba::opaque(255, 50, 50),
            Self::Mpu => Rgba::opaque(50, 150, 255),
            Self::Imx477 => Rgba::opaque(50, 255, 50),
        }
    }

    /// Packet id for the given batch sequence number.
    pub fn packet_id(self, sequence: u64) -> String {
        format!("{}_{}", self.id_prefix(), sequence)
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::TfLuna => write!(f, "TF-Luna"),
            Self::Mpu => write!(f, "MPU-6050"),
            Self::Imx477 => write!(f, "IMX477"),
        }
    }
}

impl FromStr for SensorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "tfluna" | "tf_luna" | "tf-luna" | "distance" => Ok(Self::TfLuna),
            "mpu" | "mpu6050" | "orientation" => Ok(Self::Mpu),
            "imx" | "imx477" | "imaging" => Ok(Self::Imx477),
            other => Err(format!(
                "unknown sensor '{other}' (expected tfluna, mpu or imx477)"
            )),
        }
    }
}
