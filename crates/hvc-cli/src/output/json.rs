//! JSON-formatted output for CLI.

use serde::Serialize;
use serde_json::{json, Value};

use hvc_core::protocol::Reading;

use super::{DeviceSummary, OutputFormatter};
use crate::storage::KnownDevice;

pub struct JsonOutput;

impl JsonOutput {
    pub fn new() -> Self {
        Self
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
    }
}

impl Default for JsonOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for JsonOutput {
    fn format_devices(&self, devices: &[DeviceSummary]) -> String {
        Self::to_json(&json!({
            "devices": devices,
            "count": devices.len()
        }))
    }

    fn format_known_devices(&self, devices: &[KnownDevice]) -> String {
        Self::to_json(&json!({
            "devices": devices,
            "count": devices.len()
        }))
    }

    fn format_readings(&self, device: &DeviceSummary, readings: &[Reading]) -> String {
        Self::to_json(&json!({
            "device": device,
            "readings": readings
        }))
    }

    fn format_document(&self, device: &DeviceSummary, document: &Value) -> String {
        Self::to_json(&json!({
            "device": device,
            "document": document
        }))
    }

    fn format_value(&self, unique_id: &str, path: &str, value: &Value) -> String {
        Self::to_json(&json!({
            "unique_id": unique_id,
            "path": path,
            "value": value
        }))
    }

    fn format_command_result(
        &self,
        unique_id: &str,
        command: &Value,
        success: bool,
        message: &str,
    ) -> String {
        Self::to_json(&json!({
            "unique_id": unique_id,
            "command": command,
            "success": success,
            "result": message
        }))
    }

    fn format_message(&self, message: &str) -> String {
        Self::to_json(&json!({ "message": message }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_devices_include_count() {
        let output = JsonOutput::new().format_devices(&[DeviceSummary {
            unique_id: "hvc-1".to_string(),
            name: "Attic".to_string(),
            address: "192.168.1.40:38866".to_string(),
            status: None,
        }]);

        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["count"], 1);
        assert_eq!(parsed["devices"][0]["unique_id"], "hvc-1");
        assert!(parsed["devices"][0].get("status").is_none());
    }

    #[test]
    fn test_value() {
        let output = JsonOutput::new().format_value("hvc-1", "air.rh", &json!(45.5));
        let parsed: Value = serde_json::from_str(&output).unwrap();
        assert_eq!(parsed["value"], 45.5);
        assert_eq!(parsed["path"], "air.rh");
    }
}
