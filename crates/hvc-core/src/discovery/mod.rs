//! UDP appliance discovery.
//!
//! Provides directed and broadcast discovery plus a multi-segment fan-out.

pub mod service;

pub use service::{discover, discover_all, DiscoveryOptions, DEFAULT_PORT, DISCOVERY_GRACE};
