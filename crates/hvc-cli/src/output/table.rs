//! Table-formatted output for CLI.

use colored::*;
use comfy_table::{Cell, Color, ContentArrangement, Table};
use serde_json::Value;

use hvc_core::protocol::Reading;

use super::{DeviceSummary, OutputFormatter};
use crate::storage::KnownDevice;

pub struct TableOutput;

impl TableOutput {
    pub fn new() -> Self {
        Self
    }

    fn header(device: &DeviceSummary) -> String {
        let mut header = format!(
            "Device: {} ({}) at {}",
            device.name.bold(),
            device.unique_id,
            device.address
        );
        if let Some(status) = &device.status {
            header.push_str(&format!(" [{}]", Self::colored_status(status)));
        }
        header
    }

    fn colored_status(status: &str) -> ColoredString {
        match status {
            "online" => status.green(),
            "unavailable" => status.yellow(),
            _ => status.red(),
        }
    }

    fn value_cell(reading: &Reading) -> Cell {
        let cell = Cell::new(reading.display_value());
        match &reading.value {
            None => cell.fg(Color::DarkGrey),
            Some(Value::Bool(true)) => cell.fg(Color::Green),
            Some(Value::Bool(false)) => cell.fg(Color::Red),
            Some(_) => cell,
        }
    }
}

impl Default for TableOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputFormatter for TableOutput {
    fn format_devices(&self, devices: &[DeviceSummary]) -> String {
        if devices.is_empty() {
            return "No devices found.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Unique ID", "Name", "Address", "Status"]);

        for device in devices {
            let status = match device.status.as_deref() {
                Some("online") => Cell::new("online").fg(Color::Green),
                Some("unavailable") => Cell::new("unavailable").fg(Color::Yellow),
                Some(other) => Cell::new(other).fg(Color::Red),
                None => Cell::new("-"),
            };
            table.add_row(vec![
                Cell::new(&device.unique_id),
                Cell::new(&device.name),
                Cell::new(&device.address),
                status,
            ]);
        }

        format!("{}\n\nFound {} device(s)", table, devices.len())
    }

    fn format_known_devices(&self, devices: &[KnownDevice]) -> String {
        if devices.is_empty() {
            return "No known devices.".to_string();
        }

        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Unique ID", "Name", "Host", "Port", "Added"]);

        for device in devices {
            table.add_row(vec![
                Cell::new(&device.unique_id),
                Cell::new(&device.name),
                Cell::new(&device.host),
                Cell::new(device.port.to_string()),
                Cell::new(&device.added_at),
            ]);
        }

        table.to_string()
    }

    fn format_readings(&self, device: &DeviceSummary, readings: &[Reading]) -> String {
        let mut table = Table::new();
        table.set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec!["Reading", "Value", "Key"]);

        for reading in readings {
            table.add_row(vec![
                Cell::new(reading.label),
                Self::value_cell(reading),
                Cell::new(reading.key).fg(Color::DarkGrey),
            ]);
        }

        format!("{}\n{}", Self::header(device), table)
    }

    fn format_document(&self, device: &DeviceSummary, document: &Value) -> String {
        let body = serde_json::to_string_pretty(document).unwrap_or_else(|_| document.to_string());
        format!("{}\n{}", Self::header(device), body)
    }

    fn format_value(&self, _unique_id: &str, _path: &str, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    fn format_command_result(
        &self,
        unique_id: &str,
        command: &Value,
        success: bool,
        message: &str,
    ) -> String {
        let status = if success {
            "[OK]".green()
        } else {
            "[FAIL]".red()
        };

        format!("{} {} {}\n{}", status, unique_id, command, message)
    }

    fn format_message(&self, message: &str) -> String {
        message.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hvc_core::protocol::ReadingKind;
    use serde_json::json;

    #[test]
    fn test_empty_devices() {
        assert_eq!(TableOutput::new().format_devices(&[]), "No devices found.");
        assert_eq!(
            TableOutput::new().format_known_devices(&[]),
            "No known devices."
        );
    }

    #[test]
    fn test_readings_show_unavailable() {
        let device = DeviceSummary {
            unique_id: "hvc-1".to_string(),
            name: "Attic".to_string(),
            address: "192.168.1.40:38866".to_string(),
            status: None,
        };
        let readings = vec![Reading {
            key: "air.rh",
            label: "humidity",
            kind: ReadingKind::Sensor,
            value: None,
            unit: Some("%".to_string()),
            enabled_by_default: true,
        }];

        let output = TableOutput::new().format_readings(&device, &readings);
        assert!(output.contains("humidity"));
        assert!(output.contains("unavailable"));
    }

    #[test]
    fn test_value_prints_strings_bare() {
        let output = TableOutput::new();
        assert_eq!(output.format_value("hvc-1", "conf.name", &json!("Attic")), "Attic");
        assert_eq!(output.format_value("hvc-1", "air.rh", &json!(45.5)), "45.5");
    }
}
