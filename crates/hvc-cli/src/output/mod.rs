//! Output formatting for CLI results.

pub mod json;
pub mod table;

pub use json::JsonOutput;
pub use table::TableOutput;

use serde::Serialize;
use serde_json::Value;

use hvc_core::protocol::Reading;
use hvc_core::{DeviceSession, SessionHealth};

use crate::storage::KnownDevice;

/// One row of a device listing
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceSummary {
    pub unique_id: String,
    pub name: String,
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

impl DeviceSummary {
    pub fn from_session(session: &DeviceSession) -> Self {
        Self {
            unique_id: session.unique_id().to_string(),
            name: session.name().to_string(),
            address: session.peer().to_string(),
            status: None,
        }
    }

    pub fn with_health(mut self, health: &SessionHealth) -> Self {
        self.status = Some(health_label(health));
        self
    }
}

pub fn health_label(health: &SessionHealth) -> String {
    match health {
        SessionHealth::Online => "online".to_string(),
        SessionHealth::TimedOut => "unavailable".to_string(),
        SessionHealth::Failed(reason) => format!("failed: {}", reason),
    }
}

/// Output formatter trait
pub trait OutputFormatter {
    /// Format a list of live devices
    fn format_devices(&self, devices: &[DeviceSummary]) -> String;

    /// Format the known-device store
    fn format_known_devices(&self, devices: &[KnownDevice]) -> String;

    /// Format the readings of one device
    fn format_readings(&self, device: &DeviceSummary, readings: &[Reading]) -> String;

    /// Format a raw state document
    fn format_document(&self, device: &DeviceSummary, document: &Value) -> String;

    /// Format a single value read from a document
    fn format_value(&self, unique_id: &str, path: &str, value: &Value) -> String;

    /// Format the outcome of a command sent to a device
    fn format_command_result(
        &self,
        unique_id: &str,
        command: &Value,
        success: bool,
        message: &str,
    ) -> String;

    /// Format a generic message
    fn format_message(&self, message: &str) -> String;
}

/// Get the appropriate formatter based on JSON flag
pub fn get_formatter(json: bool) -> Box<dyn OutputFormatter> {
    if json {
        Box::new(JsonOutput::new())
    } else {
        Box::new(TableOutput::new())
    }
}
