//! Command builders for the appliance protocol.
//!
//! Commands are plain JSON objects; the session adds `unique_id` and the
//! envelope when sending.

use std::time::Duration;

use serde_json::{json, Value};

use super::codec::Command;
use super::document::{is_truthy, Document};

/// Command builders for the device protocol
pub struct Commands;

impl Commands {
    /// Content-free command that keeps the appliance pushing updates.
    pub fn keepalive() -> Command {
        Command::new()
    }

    /// Ask the appliance to push its document right away.
    pub fn force_update() -> Command {
        let mut command = Command::new();
        command.insert("udp_force_update".to_string(), json!(1));
        command
    }
}

/// The two fan channels of an appliance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fan {
    Main,
    KitchenHood,
}

impl Fan {
    pub const ALL: [Fan; 2] = [Fan::Main, Fan::KitchenHood];

    /// Document key of this fan.
    pub fn key(&self) -> &'static str {
        match self {
            Fan::Main => "0",
            Fan::KitchenHood => "1",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Fan::Main => "main fan",
            Fan::KitchenHood => "kitchen hood",
        }
    }

    /// Parse a fan from its key ("0"/"1") or a short name.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "0" | "main" => Some(Fan::Main),
            "1" | "hood" | "kitchen" | "kitchen-hood" => Some(Fan::KitchenHood),
            _ => None,
        }
    }
}

/// Wi-Fi override of a fan's speed curve, in percent from -100 to 100.
///
/// Negative values lower the top of the curve, positive values raise its
/// bottom. Lowering expires sooner than raising.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FanAdjustment {
    fan: Fan,
    percent: i64,
}

impl FanAdjustment {
    pub const MIN: i64 = -100;
    pub const MAX: i64 = 100;
    pub const STEP: i64 = 5;
    pub const MAX_LOW_TIME: Duration = Duration::from_secs(3 * 3600);
    pub const MAX_HIGH_TIME: Duration = Duration::from_secs(18 * 3600);

    pub fn new(fan: Fan, percent: f64) -> Self {
        let percent = percent.round().clamp(Self::MIN as f64, Self::MAX as f64) as i64;
        Self { fan, percent }
    }

    pub fn fan(&self) -> Fan {
        self.fan
    }

    pub fn percent(&self) -> i64 {
        self.percent
    }

    pub fn to_command(&self) -> Command {
        let key = self.fan.key();
        let (points, ttl) = if self.percent < 0 {
            (json!([[0, 0], [100, self.percent + 100]]), Self::MAX_LOW_TIME)
        } else {
            (json!([[0, self.percent], [100, 100]]), Self::MAX_HIGH_TIME)
        };

        let mut command = Command::new();
        command.insert(format!("wifi_{}", key), points);
        command.insert(format!("wifi_{}_ttl", key), json!(ttl.as_millis() as u64));
        command
    }

    /// Adjustment currently active on `fan`.
    ///
    /// Zero when no Wi-Fi override is active, `None` when the curve is not
    /// one this type would have produced.
    pub fn current(document: &Document, fan: Fan) -> Option<i64> {
        let key = fan.key();
        let valid = document.get(&format!("{}.wifi.valid", key));
        if !valid.is_some_and(is_truthy) {
            return Some(0);
        }

        let points = document
            .get(&format!("{}.wifi.points", key))
            .and_then(Value::as_array)?;
        let [low, high] = points.as_slice() else {
            return None;
        };
        let low = point(low)?;
        let high = point(high)?;

        if low == (0, 0) && high.0 == 100 {
            return Some(high.1 - 100);
        }
        if high == (100, 100) && low.0 == 0 {
            return Some(low.1);
        }
        None
    }
}

fn point(value: &Value) -> Option<(i64, i64)> {
    match value.as_array()?.as_slice() {
        [x, y] => Some((x.as_i64()?, y.as_i64()?)),
        _ => None,
    }
}
