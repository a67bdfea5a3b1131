use serde::{Deserialize, Serialize};
use std::fmt;

/// Protocol a metering value was received with
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum DeviceProtocol {
    Unknown,
    DSMR,
}

impl DeviceProtocol {
    pub fn from_str(s: &str) -> Self {
        match s {
            "DSMR" | "dsmr" | "P1" => DeviceProtocol::DSMR,
            _ => DeviceProtocol::Unknown,
        }
    }

    /// Lowercase name used in ids and topics
    pub fn as_topic(&self) -> &'static str {
        match self {
            DeviceProtocol::Unknown => "unknown",
            DeviceProtocol::DSMR => "dsmr",
        }
    }
}

impl fmt::Display for DeviceProtocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceProtocol::Unknown => write!(f, "Unknown"),
            DeviceProtocol::DSMR => write!(f, "DSMR"),
        }
    }
}
