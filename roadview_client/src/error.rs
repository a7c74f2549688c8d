//! Error types for the client layer.

use roadview_core::choice::EmptyChoice;
use roadview_core::telemetry::BadFrame;
use thiserror::Error;

/// Errors raised while talking to the simulator.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server did not answer within the connection timeout
    #[error("connection to {host}:{port} timed out after {secs}s")]
    Timeout { host: String, port: u16, secs: u64 },

    /// Client and server library versions must match
    #[error("version mismatch: client {client}, server {server}")]
    VersionMismatch { client: String, server: String },

    /// The blueprint library has no entry for the requested id
    #[error("blueprint not found: {id}")]
    MissingBlueprint { id: String },

    /// Spawning an actor failed (occupied spawn point, invalid transform)
    #[error("failed to spawn {what}: {reason}")]
    Spawn { what: &'static str, reason: String },

    /// A random selection had nothing to select from
    #[error(transparent)]
    Choice(#[from] EmptyChoice),

    /// A camera payload did not match its declared dimensions
    #[error(transparent)]
    Frame(#[from] BadFrame),
}

impl ClientError {
    /// Creates a spawn error.
    pub fn spawn(what: &'static str, reason: impl std::fmt::Display) -> Self {
        Self::Spawn {
            what,
            reason: reason.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_reports_endpoint_and_budget() {
        let err = ClientError::Timeout {
            host: "localhost".into(),
            port: 2000,
            secs: 30,
        };
        assert_eq!(
            err.to_string(),
            "connection to localhost:2000 timed out after 30s"
        );
    }

    #[test]
    fn test_messages_name_the_failing_piece() {
        let err = ClientError::MissingBlueprint {
            id: "vehicle.tesla.model3".into(),
        };
        assert_eq!(err.to_string(), "blueprint not found: vehicle.tesla.model3");

        let err = ClientError::from(EmptyChoice {
            what: "spawn points",
        });
        assert!(err.to_string().contains("spawn points"));
    }
}
