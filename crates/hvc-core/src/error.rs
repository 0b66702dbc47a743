//! Error types for the Home Ventilation Control core.
//!
//! Only two kinds of failure ever leave the core: a device that did not answer
//! in time, and a broken socket. Packets that are not ours are reported with
//! [`DecodeError`] and dropped by every receive path.

use std::io;
use std::time::Duration;

use thiserror::Error;

use crate::protocol::codec::ENVELOPE;

/// No matching reply arrived before the deadline.
#[derive(Debug, Error)]
#[error("No answer from device '{unique_id}' within {timeout:?}")]
pub struct DeviceTimeoutError {
    pub unique_id: String,
    pub timeout: Duration,
}

/// Core error type for discovery and session operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Timeout(#[from] DeviceTimeoutError),

    #[error("Communication error: {message}")]
    Communication {
        message: String,
        #[source]
        source: Option<io::Error>,
    },
}

impl CoreError {
    /// Wrap a socket failure with some context.
    pub fn communication(message: impl Into<String>, source: io::Error) -> Self {
        Self::Communication {
            message: message.into(),
            source: Some(source),
        }
    }

    /// Error for operations on a session whose socket was released.
    pub fn closed(unique_id: &str) -> Self {
        Self::Communication {
            message: format!("session for device '{}' is closed", unique_id),
            source: None,
        }
    }

    /// Timeouts mean "try again later", everything else means setup is broken.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }
}

/// Reasons a datagram is not a protocol packet for us.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Datagram is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Datagram has no '{}' envelope", ENVELOPE)]
    MissingEnvelope,

    #[error("Envelope payload is not an object")]
    InvalidEnvelope,

    #[error("Payload has no string unique_id")]
    MissingUniqueId,
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_display() {
        let err: CoreError = DeviceTimeoutError {
            unique_id: "hvc-1".to_string(),
            timeout: Duration::from_secs(5),
        }
        .into();
        assert_eq!(format!("{}", err), "No answer from device 'hvc-1' within 5s");
        assert!(err.is_timeout());
    }

    #[test]
    fn test_communication_keeps_source() {
        let io_err = io::Error::new(io::ErrorKind::ConnectionRefused, "refused");
        let err = CoreError::communication("Cannot connect to 10.0.0.2:38866", io_err);
        assert!(!err.is_timeout());
        assert!(std::error::Error::source(&err).is_some());
        assert!(format!("{}", err).contains("10.0.0.2:38866"));
    }

    #[test]
    fn test_decode_error_names_envelope() {
        let err = DecodeError::MissingEnvelope;
        assert_eq!(
            format!("{}", err),
            "Datagram has no 'HomeVentilationControl' envelope"
        );
    }
}
