//! Command implementations.

pub mod devices;
pub mod discover;
pub mod fan;
pub mod get;
pub mod send;
pub mod status;
pub mod watch;

pub use devices::run_devices;
pub use discover::run_discover;
pub use fan::run_fan;
pub use get::run_get;
pub use send::run_send;
pub use status::run_status;
pub use watch::run_watch;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use hvc_core::{DiscoveryOptions, DEFAULT_PORT};

use crate::cli::Cli;
use crate::error::{CliError, StorageError};
use crate::storage::{default_data_dir, DeviceStore};

/// Global options shared by every command
#[derive(Debug, Clone)]
pub struct Context {
    pub json: bool,
    pub timeout: Duration,
    pub port: u16,
    pub broadcast: Vec<IpAddr>,
    pub data_dir: Option<PathBuf>,
}

impl Default for Context {
    fn default() -> Self {
        Self {
            json: false,
            timeout: hvc_core::device::REQUEST_TIMEOUT,
            port: DEFAULT_PORT,
            broadcast: vec![IpAddr::V4(Ipv4Addr::BROADCAST)],
            data_dir: None,
        }
    }
}

impl From<&Cli> for Context {
    fn from(cli: &Cli) -> Self {
        Self {
            json: cli.json,
            timeout: Duration::from_millis(cli.timeout),
            port: cli.port,
            broadcast: cli.broadcast.clone(),
            data_dir: cli.data_dir.clone(),
        }
    }
}

impl Context {
    pub fn broadcast_addresses(&self) -> Vec<SocketAddr> {
        self.broadcast
            .iter()
            .map(|ip| SocketAddr::new(*ip, self.port))
            .collect()
    }

    pub fn discovery_options(&self) -> DiscoveryOptions {
        DiscoveryOptions::default().with_timeout(self.timeout)
    }

    /// Open the known-device store in the configured or default directory.
    pub fn store(&self) -> Result<DeviceStore, CliError> {
        let dir = match &self.data_dir {
            Some(dir) => dir.clone(),
            None => default_data_dir()
                .ok_or_else(|| {
                    StorageError::DirectoryAccess("No home directory available".to_string())
                })?
                .join("devices"),
        };
        Ok(DeviceStore::new(dir)?)
    }
}
