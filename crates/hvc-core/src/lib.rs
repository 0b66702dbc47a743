//! Shared core library for Home Ventilation Control appliances.
//!
//! Appliances speak unauthenticated JSON over UDP (port 38866 by default).
//! This crate discovers them, keeps a live session per appliance, and gives
//! dotted-path access to the state document each one pushes.
//!
//! ```no_run
//! use hvc_core::discovery::{discover, DiscoveryOptions, DEFAULT_PORT};
//!
//! # async fn run() -> hvc_core::Result<()> {
//! let address = ([255, 255, 255, 255], DEFAULT_PORT).into();
//! for (unique_id, mut session) in discover(address, &DiscoveryOptions::broadcast()).await? {
//!     session.keep_alive()?;
//!     session.receive_nonblocking()?;
//!     println!("{unique_id}: {:?}", session.get("air.temperature"));
//! }
//! # Ok(())
//! # }
//! ```

pub mod device;
pub mod discovery;
pub mod error;
pub mod protocol;
pub mod registry;

pub use device::{DeviceSession, SessionHealth, SessionTimings};
pub use discovery::{discover, discover_all, DiscoveryOptions, DEFAULT_PORT};
pub use error::{CoreError, DecodeError, DeviceTimeoutError, Result};
pub use protocol::{Command, Document};
pub use registry::SessionRegistry;
