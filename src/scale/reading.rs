use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::error::ScaleError;

pub const NOT_FOUND_MESSAGE: &str = "USB scale not found";
pub const PARSE_FAILURE_MESSAGE: &str = "Failed to parse weight from scale data";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    #[default]
    G,
    Kg,
    Lb,
}

impl WeightUnit {
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightUnit::G => "g",
            WeightUnit::Kg => "kg",
            WeightUnit::Lb => "lb",
        }
    }
}

impl fmt::Display for WeightUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WeightUnit {
    type Err = ScaleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "g" => Ok(WeightUnit::G),
            "kg" => Ok(WeightUnit::Kg),
            "lb" => Ok(WeightUnit::Lb),
            other => Err(ScaleError::ParseError(other.to_string())),
        }
    }
}

/// A successfully parsed weight, stamped when it was read off the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightReading {
    pub value: f64,
    pub unit: WeightUnit,
    pub captured_at: DateTime<Utc>,
}

impl WeightReading {
    pub fn new(value: f64, unit: WeightUnit) -> Self {
        Self {
            value,
            unit,
            captured_at: Utc::now(),
        }
    }
}

impl fmt::Display for WeightReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} {}", self.value, self.unit)
    }
}

/// Result of one `get_weight()` attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingOutcome {
    Success(WeightReading),
    DeviceNotFound,
    ParseFailure,
    IoError(String),
}

impl ReadingOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ReadingOutcome::Success(_))
    }

    pub fn reading(&self) -> Option<&WeightReading> {
        match self {
            ReadingOutcome::Success(reading) => Some(reading),
            _ => None,
        }
    }

    /// HTTP status the outcome is reported with.
    pub fn status_code(&self) -> u16 {
        match self {
            ReadingOutcome::Success(_) => 200,
            ReadingOutcome::DeviceNotFound => 404,
            ReadingOutcome::ParseFailure | ReadingOutcome::IoError(_) => 500,
        }
    }

    /// JSON body; only a success carries a number.
    pub fn body(&self) -> serde_json::Value {
        match self {
            ReadingOutcome::Success(reading) => {
                serde_json::json!({ "weight": reading.value, "unit": reading.unit })
            }
            ReadingOutcome::DeviceNotFound => serde_json::json!({ "error": NOT_FOUND_MESSAGE }),
            ReadingOutcome::ParseFailure => serde_json::json!({ "error": PARSE_FAILURE_MESSAGE }),
            ReadingOutcome::IoError(detail) => {
                serde_json::json!({ "error": format!("Error reading scale: {}", detail) })
            }
        }
    }

    /// Short label used in logs and the `watch` command.
    pub fn label(&self) -> &'static str {
        match self {
            ReadingOutcome::Success(_) => "connected",
            ReadingOutcome::DeviceNotFound => "disconnected",
            ReadingOutcome::ParseFailure | ReadingOutcome::IoError(_) => "error",
        }
    }
}
