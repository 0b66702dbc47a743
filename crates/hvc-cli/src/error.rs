//! Error types for the hvc CLI.
//!
//! CliError wraps CoreError from the shared library and adds CLI-specific variants.

use hvc_core::CoreError;
use thiserror::Error;

/// Exit codes for the CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const GENERAL_ERROR: i32 = 1;
    pub const NETWORK_ERROR: i32 = 2;
    pub const DEVICE_ERROR: i32 = 3;
    pub const INVALID_ARGS: i32 = 4;
}

/// Known-device store errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to access storage directory: {0}")]
    DirectoryAccess(String),

    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Main error type for the CLI
#[derive(Error, Debug)]
pub enum CliError {
    #[error("{0}")]
    Core(#[from] CoreError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("No devices found")]
    NoDevicesFound,

    #[error("Path not found in document: {0}")]
    PathNotFound(String),
}

impl CliError {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::Core(e) if e.is_timeout() => exit_codes::NETWORK_ERROR,
            CliError::Core(_) => exit_codes::DEVICE_ERROR,
            CliError::Storage(_) | CliError::Io(_) => exit_codes::GENERAL_ERROR,
            CliError::InvalidArgument(_) => exit_codes::INVALID_ARGS,
            CliError::NoDevicesFound | CliError::PathNotFound(_) => exit_codes::GENERAL_ERROR,
        }
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use hvc_core::DeviceTimeoutError;
    use std::time::Duration;

    #[test]
    fn test_timeout_is_network_error() {
        let err: CliError = CoreError::from(DeviceTimeoutError {
            unique_id: "hvc-1".to_string(),
            timeout: Duration::from_secs(5),
        })
        .into();
        assert_eq!(err.exit_code(), exit_codes::NETWORK_ERROR);
    }

    #[test]
    fn test_communication_is_device_error() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: CliError = CoreError::communication("Cannot broadcast", io_err).into();
        assert_eq!(err.exit_code(), exit_codes::DEVICE_ERROR);
    }

    #[test]
    fn test_storage_error_display() {
        let err = CliError::from(StorageError::NotFound("hvc-1".to_string()));
        assert_eq!(format!("{}", err), "Storage error: Not found: hvc-1");
        assert_eq!(err.exit_code(), exit_codes::GENERAL_ERROR);
    }
}
