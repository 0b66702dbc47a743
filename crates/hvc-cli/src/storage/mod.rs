//! Local storage for the CLI.

pub mod devices;

pub use devices::{DeviceStore, KnownDevice};

/// Get the default data directory for hvc.
///
/// Uses the `directories` crate to find the appropriate platform-specific
/// data directory.
pub fn default_data_dir() -> Option<std::path::PathBuf> {
    directories::ProjectDirs::from("", "hvc", "hvc").map(|dirs| dirs.data_dir().to_path_buf())
}
