//! Protocol layer for appliance communication.
//!
//! This module handles encoding commands and decoding the state documents
//! pushed by Home Ventilation Control appliances.

pub mod codec;
pub mod commands;
pub mod document;
pub mod sensors;

pub use codec::{decode, encode, Command, ENVELOPE, MAX_DATAGRAM_SIZE};
pub use commands::{Commands, Fan, FanAdjustment};
pub use document::Document;
pub use sensors::{Reading, ReadingKind, SENSORS};
