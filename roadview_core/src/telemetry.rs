//! Telemetry value types copied out of sensor callbacks.
//!
//! Each record mirrors one CARLA measurement: an inertial frame, a geodetic
//! fix, and a raw BGRA camera frame. Records are overwritten in place by the
//! most recent callback and read by the render loop; there is no history and
//! no derived invariant beyond "latest value wins".

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Gravity in the simulator's frame, meters per second squared.
pub const GRAVITY: Vector3<f32> = Vector3::new(0.0, 0.0, 9.81);

/// One inertial measurement: linear acceleration, angular rate, and a
/// compass heading in radians clockwise from north.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImuFrame {
    /// Raw accelerometer reading, gravity included (m/s^2)
    pub accelerometer: Vector3<f32>,

    /// Angular rate (rad/s)
    pub gyroscope: Vector3<f32>,

    /// Heading in radians, 0 = north, increasing clockwise
    pub compass: f32,
}

impl ImuFrame {
    /// Magnitude of the acceleration with gravity subtracted.
    pub fn linear_acceleration(&self) -> f32 {
        (self.accelerometer - GRAVITY).norm()
    }

    /// Magnitude of the angular rate.
    pub fn rotation_rate(&self) -> f32 {
        self.gyroscope.norm()
    }
}

impl Default for ImuFrame {
    fn default() -> Self {
        Self {
            accelerometer: GRAVITY,
            gyroscope: Vector3::zeros(),
            compass: 0.0,
        }
    }
}

/// A geodetic fix from the GNSS sensor.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GeoFix {
    /// Degrees north
    pub latitude: f64,

    /// Degrees east
    pub longitude: f64,

    /// Meters above sea level
    pub altitude: f64,
}

/// Raised when a camera payload does not match its declared dimensions.
#[derive(Debug, Error)]
#[error("camera frame is {actual} bytes, expected {expected} ({width}x{height}x4)")]
pub struct BadFrame {
    pub width: u32,
    pub height: u32,
    pub expected: usize,
    pub actual: usize,
}

/// One BGRA camera frame, row-major, 4 bytes per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CameraFrame {
    width: u32,
    height: u32,
    bgra: Vec<u8>,
}

impl CameraFrame {
    /// Wraps a raw BGRA buffer, validating its length against the
    /// declared dimensions.
    pub fn new(width: u32, height: u32, bgra: Vec<u8>) -> Result<Self, BadFrame> {
        let expected = width as usize * height as usize * 4;
        if bgra.len() != expected {
            return Err(BadFrame {
                width,
                height,
                expected,
                actual: bgra.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bgra,
        })
    }

    /// A single opaque black pixel, the placeholder shown before the first
    /// camera callback arrives.
    pub fn placeholder() -> Self {
        Self {
            width: 1,
            height: 1,
            bgra: vec![0, 0, 0, 255],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn as_bgra(&self) -> &[u8] {
        &self.bgra
    }

    /// Consumes the frame, returning the raw buffer.
    pub fn into_bgra(self) -> Vec<u8> {
        self.bgra
    }
}

/// One serializable line of the telemetry log, emitted per rendered frame.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryRecord {
    /// Render-loop frame counter
    pub frame: u64,

    /// Wall-clock time since the run started, seconds
    pub elapsed_sec: f64,

    /// Latest geodetic fix, if any callback has fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub geo: Option<GeoFix>,

    /// Derived inertial readouts, if any callback has fired
    #[serde(skip_serializing_if = "Option::is_none")]
    pub imu: Option<ImuReadout>,
}

/// The derived IMU numbers shown on the HUD.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ImuReadout {
    pub linear_acceleration: f32,
    pub rotation_rate: f32,
    pub compass: f32,
}

impl From<&ImuFrame> for ImuReadout {
    fn from(frame: &ImuFrame) -> Self {
        Self {
            linear_acceleration: frame.linear_acceleration(),
            rotation_rate: frame.rotation_rate(),
            compass: frame.compass,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_linear_acceleration_at_rest() {
        // A stationary IMU reads pure gravity; subtracting it leaves zero.
        let frame = ImuFrame::default();
        assert_relative_eq!(frame.linear_acceleration(), 0.0);
    }

    #[test]
    fn test_linear_acceleration_braking() {
        let frame = ImuFrame {
            accelerometer: Vector3::new(-3.0, 4.0, 9.81),
            ..ImuFrame::default()
        };
        assert_relative_eq!(frame.linear_acceleration(), 5.0, epsilon = 1e-6);
    }

    #[test]
    fn test_rotation_rate_norm() {
        let frame = ImuFrame {
            gyroscope: Vector3::new(0.0, 0.3, 0.4),
            ..ImuFrame::default()
        };
        assert_relative_eq!(frame.rotation_rate(), 0.5, epsilon = 1e-6);
    }

    #[test]
    fn test_camera_frame_length_checked() {
        assert!(CameraFrame::new(2, 2, vec![0u8; 16]).is_ok());
        let err = CameraFrame::new(2, 2, vec![0u8; 15]).unwrap_err();
        assert_eq!(err.expected, 16);
        assert_eq!(err.actual, 15);
    }

    #[test]
    fn test_placeholder_is_valid() {
        let frame = CameraFrame::placeholder();
        assert_eq!(frame.width(), 1);
        assert_eq!(frame.height(), 1);
        assert_eq!(frame.as_bgra().len(), 4);
    }

    #[test]
    fn test_record_skips_missing_sensors() {
        let record = TelemetryRecord {
            frame: 7,
            elapsed_sec: 0.25,
            geo: None,
            imu: None,
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(!json.contains("geo"));
        assert!(!json.contains("imu"));

        let record = TelemetryRecord {
            geo: Some(GeoFix {
                latitude: 52.5,
                longitude: 13.4,
                altitude: 34.0,
            }),
            ..record
        };
        let json = serde_json::to_string(&record).unwrap();
        assert!(json.contains("\"latitude\":52.5"));
    }
}
