//! Device communication layer.
//!
//! A [`DeviceSession`] is the live connection to one appliance; the socket
//! helpers are shared with discovery.

pub mod session;
pub mod socket;

pub use session::{
    DeviceSession, SessionHealth, SessionTimings, KEEPALIVE_INTERVAL, REQUEST_TIMEOUT,
    UPDATE_TIMEOUT,
};
