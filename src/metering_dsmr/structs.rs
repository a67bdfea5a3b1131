use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use crate::obis_utils::{ObisCode, ObisIdentifier};
use super::values::ValueRule;
use super::DsmrError;

/// Identification line of a telegram, e.g. `/ISk5\2MT382-1000`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct P1Header {
    pub manufacturer: String,
    pub identification: String,
}

/// What a catalog entry measures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Quantity {
    Version,
    Timestamp,
    EquipmentIdentifier,
    Energy,
    Power,
    Voltage,
    Current,
    TariffIndicator,
    SwitchPosition,
    Count,
    EventLog,
    Text,
    DeviceType,
    MeterReading,
}

/// Catalog entry describing one known OBIS object
#[derive(Debug, PartialEq)]
pub struct CosemObjectType {
    pub name: &'static str,
    pub id: ObisIdentifier,
    pub quantity: Quantity,
    pub unit: Option<&'static str>,
    pub rule: ValueRule,
}

impl CosemObjectType {
    pub const fn new(name: &'static str, id: ObisIdentifier, quantity: Quantity, unit: Option<&'static str>, rule: ValueRule) -> Self {
        CosemObjectType { name, id, quantity, unit, rule }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PowerFailure {
    pub end: DateTime<FixedOffset>,
    pub duration_secs: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CosemValue {
    Integer(i64),
    Decimal { value: f64, unit: Option<String> },
    Text(String),
    Timestamp(DateTime<FixedOffset>),
    State { code: u32, label: &'static str },
    Timestamped { at: DateTime<FixedOffset>, value: Box<CosemValue> },
    EventLog(Vec<PowerFailure>),
    Raw(Vec<String>),
}

impl CosemValue {
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            CosemValue::Integer(i) => Some(*i),
            CosemValue::State { code, .. } => Some(*code as i64),
            CosemValue::Timestamped { value, .. } => value.as_integer(),
            _ => None,
        }
    }

    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            CosemValue::Decimal { value, .. } => Some(*value),
            CosemValue::Integer(i) => Some(*i as f64),
            CosemValue::Timestamped { value, .. } => value.as_decimal(),
            _ => None,
        }
    }

    pub fn unit(&self) -> Option<&str> {
        match self {
            CosemValue::Decimal { unit, .. } => unit.as_deref(),
            CosemValue::Timestamped { value, .. } => value.unit(),
            _ => None,
        }
    }

    /// Capture time for values that carry one (M-Bus readings).
    pub fn captured_at(&self) -> Option<DateTime<FixedOffset>> {
        match self {
            CosemValue::Timestamped { at, .. } => Some(*at),
            _ => None,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            CosemValue::Integer(i) => (*i).into(),
            CosemValue::Decimal { value, .. } => (*value).into(),
            CosemValue::Text(s) => s.clone().into(),
            CosemValue::Timestamp(t) => t.to_rfc3339().into(),
            CosemValue::State { label, .. } => (*label).into(),
            CosemValue::Timestamped { value, .. } => value.to_json(),
            CosemValue::EventLog(_) => serde_json::to_value(self).unwrap_or(serde_json::Value::Null),
            CosemValue::Raw(values) => values.join(",").into(),
        }
    }
}

/// One decoded line of a telegram
#[derive(Debug, Clone, PartialEq)]
pub struct CosemObject {
    pub obis: ObisCode,
    pub object_type: Option<&'static CosemObjectType>,
    pub raw_values: Vec<String>,
    pub value: CosemValue,
}

impl CosemObject {
    pub fn is_known(&self) -> bool {
        self.object_type.is_some()
    }

    /// Catalog name, the OBIS code for unknown objects
    pub fn name(&self) -> String {
        match self.object_type {
            Some(t) => t.name.to_string(),
            None => self.obis.to_string(),
        }
    }
}

/// A validated and decoded telegram
#[derive(Debug)]
pub struct P1Telegram {
    pub header: P1Header,
    pub objects: Vec<CosemObject>,
    pub line_errors: Vec<DsmrError>,
    pub checksum: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MeterKind {
    MainElectricity,
    Gas,
    Water,
    Heat,
    Cooling,
    Generic,
    Device,
}

impl MeterKind {
    pub fn is_mbus(&self) -> bool {
        !matches!(self, MeterKind::MainElectricity)
    }

    /// Main electricity lives on channel 0, everything else behind an M-Bus slot
    pub fn is_plausible_on(&self, channel: u8) -> bool {
        match self {
            MeterKind::MainElectricity => channel == 0,
            _ => channel >= 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeterKind::MainElectricity => "main_electricity",
            MeterKind::Gas => "gas",
            MeterKind::Water => "water",
            MeterKind::Heat => "heat",
            MeterKind::Cooling => "cooling",
            MeterKind::Generic => "generic",
            MeterKind::Device => "device",
        }
    }
}

impl fmt::Display for MeterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, PartialEq)]
pub struct MeterTypeDefinition {
    pub name: &'static str,
    pub kind: MeterKind,
    /// Object holding the meter serial, if the meter type sends one
    pub identifier: Option<ObisIdentifier>,
    pub required: &'static [ObisIdentifier],
    pub optional: &'static [ObisIdentifier],
    /// Accepted M-Bus device types (0-n:24.1.0), empty for channel 0 meters
    pub device_types: &'static [u8],
}

impl MeterTypeDefinition {
    pub fn identifiers(&self) -> impl Iterator<Item = &ObisIdentifier> {
        self.required.iter().chain(self.optional.iter())
    }

    pub fn total_len(&self) -> usize {
        self.required.len() + self.optional.len()
    }

    pub fn accepts_device_type(&self, device_type: i64) -> bool {
        self.device_types.iter().any(|t| *t as i64 == device_type)
    }
}

/// Stable identity of a physical meter: its type and channel
#[derive(Debug, Clone, Copy)]
pub struct MeterDescriptor {
    pub meter_type: &'static MeterTypeDefinition,
    pub channel: u8,
}

impl MeterDescriptor {
    pub fn new(meter_type: &'static MeterTypeDefinition, channel: u8) -> Self {
        MeterDescriptor { meter_type, channel }
    }

    pub fn kind(&self) -> MeterKind {
        self.meter_type.kind
    }

    /// Name used for publishing, e.g. `gas_1`
    pub fn meter_name(&self) -> String {
        format!("{}_{}", self.meter_type.kind, self.channel)
    }

    /// Equipment serial the meter sent in `objects`, if its type has one
    pub fn serial(&self, objects: &[CosemObject]) -> Option<String> {
        let code = self.meter_type.identifier.as_ref()?
            .instantiate(self.channel)
            .canonical();

        objects.iter()
            .find(|o| o.obis.canonical() == code)
            .and_then(|o| match &o.value {
                CosemValue::Text(serial) if !serial.is_empty() => Some(serial.clone()),
                _ => None,
            })
    }
}

impl PartialEq for MeterDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.meter_type.name == other.meter_type.name && self.channel == other.channel
    }
}

impl Eq for MeterDescriptor {}

impl Hash for MeterDescriptor {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meter_type.name.hash(state);
        self.channel.hash(state);
    }
}

impl PartialOrd for MeterDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MeterDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.channel.cmp(&other.channel)
            .then(self.meter_type.kind.cmp(&other.meter_type.kind))
            .then(self.meter_type.name.cmp(other.meter_type.name))
    }
}

impl fmt::Display for MeterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.meter_type.name, self.channel)
    }
}
