//! Latest-value cells bridging sensor callbacks and the render loop.
//!
//! CARLA invokes sensor callbacks on its own delivery threads while the
//! render loop polls from the main thread, so each shared value sits behind
//! a mutex. The newest write wins, readers see the most recent complete
//! value, nothing is queued.

use std::sync::{Arc, Mutex};

use crate::telemetry::{CameraFrame, GeoFix, ImuFrame};

/// A shared cell holding the most recent value of `T`.
///
/// `store` replaces the content; `load` clones it out. Cloning keeps the
/// lock hold time bounded by the copy, so a slow render pass never blocks
/// a sensor callback for longer than one frame copy.
#[derive(Debug)]
pub struct Latest<T> {
    slot: Mutex<Option<T>>,
}

impl<T> Default for Latest<T> {
    fn default() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }
}

impl<T: Clone> Latest<T> {
    pub fn new() -> Self {
        Self {
            slot: Mutex::new(None),
        }
    }

    /// Replaces the cell content with `value`.
    pub fn store(&self, value: T) {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        *slot = Some(value);
    }

    /// Clones out the most recent value, if any write has happened yet.
    pub fn load(&self) -> Option<T> {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.clone()
    }

    /// True once at least one value has been stored.
    pub fn is_set(&self) -> bool {
        let slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        slot.is_some()
    }
}

/// One cell per sensor, shared between the callbacks and the render loop.
#[derive(Debug, Default)]
pub struct TelemetryHub {
    pub camera: Latest<CameraFrame>,
    pub gnss: Latest<GeoFix>,
    pub imu: Latest<ImuFrame>,
}

impl TelemetryHub {
    /// Creates an empty hub behind an `Arc` so each callback closure can
    /// hold its own handle.
    pub fn shared() -> Arc<Self> {
        Arc::new(Self::default())
    }
}
