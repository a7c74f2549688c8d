//! Roadview Client - simulator-facing plumbing.
//!
//! Everything between the CARLA client library and the viewer loop lives
//! here: the callback-based [`SensorSource`] abstraction, mock sources that
//! run without a simulator, and (behind the `carla` feature) the session
//! layer that connects, spawns actors, and tears everything down again.

pub mod error;
pub mod mock;
pub mod source;

#[cfg(feature = "carla")]
pub mod session;

pub use error::ClientError;
pub use mock::MockSource;
pub use source::{SensorCallback, SensorKind, SensorPayload, SensorSource};

#[cfg(feature = "carla")]
pub use session::{Session, SessionConfig};
