//! Callback-based sensor source abstraction.
//!
//! Mirrors the CARLA client's native `listen`/`stop` pattern so that real
//! sensors and mock sensors present the same surface to the viewer: the
//! source pushes [`SensorPayload`]s into a callback on its own delivery
//! thread, and the consumer routes them into latest-value cells.

use std::sync::Arc;

use roadview_core::telemetry::{CameraFrame, GeoFix, ImuFrame};

/// The sensors the viewer attaches to the ego vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Camera,
    Gnss,
    Imu,
}

impl SensorKind {
    /// The CARLA blueprint id for this sensor.
    pub fn blueprint_id(&self) -> &'static str {
        match self {
            Self::Camera => "sensor.camera.rgb",
            Self::Gnss => "sensor.other.gnss",
            Self::Imu => "sensor.other.imu",
        }
    }
}

impl std::fmt::Display for SensorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.blueprint_id())
    }
}

/// One measurement pushed out of a sensor callback.
#[derive(Debug, Clone)]
pub enum SensorPayload {
    Camera(CameraFrame),
    Gnss(GeoFix),
    Imu(ImuFrame),
}

impl SensorPayload {
    pub fn kind(&self) -> SensorKind {
        match self {
            Self::Camera(_) => SensorKind::Camera,
            Self::Gnss(_) => SensorKind::Gnss,
            Self::Imu(_) => SensorKind::Imu,
        }
    }
}

/// Shared callback handed to a source; invoked once per measurement on the
/// source's delivery thread.
pub type SensorCallback = Arc<dyn Fn(SensorPayload) + Send + Sync>;

/// A source of sensor measurements.
///
/// Real CARLA sensors and mock sensors both implement this; the viewer only
/// ever sees the trait. `listen` while already listening is a no-op, and
/// `stop` halts delivery (no further callback invocations once it returns).
pub trait SensorSource: Send + Sync {
    /// Which sensor this is.
    fn kind(&self) -> SensorKind;

    /// Starts delivery into `callback`. Idempotent.
    fn listen(&self, callback: SensorCallback);

    /// Stops delivery.
    fn stop(&self);

    /// True while a callback is registered and running.
    fn is_listening(&self) -> bool;
}
