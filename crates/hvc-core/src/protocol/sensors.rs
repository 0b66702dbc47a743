//! Catalogue of known document fields and their presentation.

use serde::Serialize;
use serde_json::{Number, Value};

use super::document::{is_truthy, Document};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReadingKind {
    Sensor,
    Binary,
}

/// Conversion from the raw device value to the displayed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scale {
    Identity,
    /// Device sends thousandths (uptime in ms).
    Thousandths,
    /// Device sends tenths (humidity, temperature).
    Tenths,
}

impl Scale {
    fn apply(self, value: Value) -> Value {
        let divisor = match self {
            Scale::Identity => return value,
            Scale::Thousandths => 1000.0,
            Scale::Tenths => 10.0,
        };
        match value.as_f64() {
            Some(raw) => Number::from_f64(raw / divisor).map_or(value, Value::Number),
            None => value,
        }
    }
}

/// One known field of the document.
#[derive(Debug, Clone, Copy)]
pub struct SensorSpec {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ReadingKind,
    pub unit: Option<&'static str>,
    /// Document path holding the unit, for fields whose unit is device-defined.
    pub unit_path: Option<&'static str>,
    pub scale: Scale,
    pub enabled_by_default: bool,
}

const fn sensor(enabled: bool, key: &'static str, label: &'static str, unit: Option<&'static str>) -> SensorSpec {
    SensorSpec {
        key,
        label,
        kind: ReadingKind::Sensor,
        unit,
        unit_path: None,
        scale: Scale::Identity,
        enabled_by_default: enabled,
    }
}

const fn binary(enabled: bool, key: &'static str, label: &'static str) -> SensorSpec {
    SensorSpec {
        kind: ReadingKind::Binary,
        ..sensor(enabled, key, label, None)
    }
}

const fn scaled(spec: SensorSpec, scale: Scale) -> SensorSpec {
    SensorSpec { scale, ..spec }
}

const fn unit_from(spec: SensorSpec, unit_path: &'static str) -> SensorSpec {
    SensorSpec {
        unit_path: Some(unit_path),
        ..spec
    }
}

const PERCENT: Option<&str> = Some("%");
const RPM: Option<&str> = Some("rpm");

pub const SENSORS: &[SensorSpec] = &[
    scaled(sensor(false, "uptime", "Uptime", Some("s")), Scale::Thousandths),
    scaled(sensor(true, "air.rh", "relative humidity", PERCENT), Scale::Tenths),
    scaled(sensor(true, "air.temperature", "temperature", Some("°C")), Scale::Tenths),
    binary(false, "0.on", "main fan switch"),
    binary(false, "0.own", "main custom control switch"),
    sensor(true, "0.target", "main fan speed", PERCENT),
    sensor(false, "0.target_no_wifi", "main fan target speed before Wi-Fi adjustment", PERCENT),
    sensor(true, "0.percentage", "main fan measured speed", PERCENT),
    sensor(false, "0.rpm", "main fan RPM", RPM),
    unit_from(sensor(true, "0.controller.level", "main controller level", None), "0.controller.unit"),
    sensor(false, "0.ir.speed", "main IR level", None),
    binary(true, "0.wifi.valid", "main fan Wi-Fi settings active"),
    unit_from(
        sensor(false, "0.controller.measured_level", "main controller measured level", None),
        "0.controller.unit",
    ),
    sensor(false, "0.controller.millivolts", "main controller voltage", Some("mV")),
    binary(false, "1.on", "kitchen hood fan switch"),
    binary(false, "1.own", "kitchen hood custom control switch"),
    sensor(true, "1.target", "kitchen hood fan speed", PERCENT),
    sensor(false, "1.target_no_wifi", "kitchen hood fan target speed before Wi-Fi adjustment", PERCENT),
    sensor(true, "1.percentage", "kitchen hood fan measured speed", PERCENT),
    sensor(false, "1.rpm", "kitchen hood fan RPM", RPM),
    unit_from(sensor(true, "1.controller.level", "kitchen hood controller level", None), "1.controller.unit"),
    sensor(true, "1.ir.speed", "kitchen hood IR level", None),
    binary(true, "1.wifi.valid", "kitchen hood fan Wi-Fi settings active"),
    unit_from(
        sensor(false, "1.controller.measured_level", "kitchen hood controller measured level", None),
        "1.controller.unit",
    ),
    sensor(false, "1.controller.millivolts", "kitchen hood controller voltage", Some("mV")),
    binary(true, "1.ir.light", "kitchen hood IR light"),
];

/// A catalogue entry evaluated against a document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reading {
    pub key: &'static str,
    pub label: &'static str,
    pub kind: ReadingKind,
    pub value: Option<Value>,
    pub unit: Option<String>,
    pub enabled_by_default: bool,
}

impl Reading {
    pub fn evaluate(spec: &SensorSpec, document: &Document) -> Self {
        let value = document.get(spec.key).cloned().map(|raw| match spec.kind {
            ReadingKind::Binary => Value::Bool(is_truthy(&raw)),
            ReadingKind::Sensor => spec.scale.apply(raw),
        });

        let unit = spec
            .unit_path
            .and_then(|path| document.get_str(path))
            .or(spec.unit)
            .map(str::to_string);

        Self {
            key: spec.key,
            label: spec.label,
            kind: spec.kind,
            value,
            unit,
            enabled_by_default: spec.enabled_by_default,
        }
    }

    /// Evaluate the whole catalogue.
    pub fn from_document(document: &Document) -> Vec<Reading> {
        SENSORS
            .iter()
            .map(|spec| Reading::evaluate(spec, document))
            .collect()
    }

    /// Human-readable value with unit, or "unavailable".
    pub fn display_value(&self) -> String {
        let Some(value) = &self.value else {
            return "unavailable".to_string();
        };

        let text = match value {
            Value::Bool(true) => "on".to_string(),
            Value::Bool(false) => "off".to_string(),
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };

        match &self.unit {
            Some(unit) if !unit.is_empty() => format!("{} {}", text, unit),
            _ => text,
        }
    }
}
