//! Roadview Core - Telemetry plumbing for a CARLA client viewer
//!
//! This library carries everything the viewer needs that is independent of
//! the simulator and of the display backend:
//! 1. **Telemetry types**: plain value records copied out of sensor callbacks
//! 2. **Latest-value hub**: mutex-backed cells bridging callback threads and
//!    the polling render loop
//! 3. **Overlay geometry**: backend-independent HUD layout (boxed text,
//!    four-point compass) emitted as draw operations

pub mod choice;
pub mod export;
pub mod hub;
pub mod overlay;
pub mod telemetry;

// Re-export key types for convenience
pub use choice::{random_choice, EmptyChoice};
pub use hub::{Latest, TelemetryHub};
pub use overlay::{Color, DrawOp, TextMeasure};
pub use telemetry::{CameraFrame, GeoFix, ImuFrame};
