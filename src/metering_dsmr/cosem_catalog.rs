use lazy_static::lazy_static;
use std::collections::HashMap;
use crate::obis_utils::{ObisCode, ObisIdentifier};
use super::structs::{CosemObjectType, Quantity};
use super::values::{ValueRule, SWITCH_STATES};

// Telegram level objects
pub const P1_VERSION: ObisIdentifier = ObisIdentifier::resolved(1, 3, 0, 2, 8);
pub const P1_EMUCS_VERSION: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 1, 4);
pub const P1_TIMESTAMP: ObisIdentifier = ObisIdentifier::resolved(0, 0, 1, 0, 0);
pub const P1_TEXT_CODE: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 13, 1);
pub const P1_TEXT_STRING: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 13, 0);

// Main electricity meter
pub const EMETER_EQUIPMENT_IDENTIFIER_V2: ObisIdentifier = ObisIdentifier::resolved(0, 0, 42, 0, 0);
pub const EMETER_EQUIPMENT_IDENTIFIER: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 1, 1);
pub const EMETER_DELIVERY_TARIFF1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 1, 8, 1);
pub const EMETER_DELIVERY_TARIFF2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 1, 8, 2);
pub const EMETER_PRODUCTION_TARIFF1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 2, 8, 1);
pub const EMETER_PRODUCTION_TARIFF2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 2, 8, 2);
pub const EMETER_TARIFF_INDICATOR: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 14, 0);
pub const EMETER_ACTUAL_DELIVERY: ObisIdentifier = ObisIdentifier::resolved(1, 0, 1, 7, 0);
pub const EMETER_ACTUAL_PRODUCTION: ObisIdentifier = ObisIdentifier::resolved(1, 0, 2, 7, 0);
pub const EMETER_ACTUAL_THRESHOLD: ObisIdentifier = ObisIdentifier::resolved(0, 0, 17, 0, 0);
pub const EMETER_SWITCH_POSITION: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 3, 10);
pub const EMETER_POWER_FAILURES: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 7, 21);
pub const EMETER_LONG_POWER_FAILURES: ObisIdentifier = ObisIdentifier::resolved(0, 0, 96, 7, 9);
pub const EMETER_POWER_FAILURE_LOG: ObisIdentifier = ObisIdentifier::resolved(1, 0, 99, 97, 0);
pub const EMETER_VOLTAGE_SAGS_L1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 32, 32, 0);
pub const EMETER_VOLTAGE_SAGS_L2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 52, 32, 0);
pub const EMETER_VOLTAGE_SAGS_L3: ObisIdentifier = ObisIdentifier::resolved(1, 0, 72, 32, 0);
pub const EMETER_VOLTAGE_SWELLS_L1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 32, 36, 0);
pub const EMETER_VOLTAGE_SWELLS_L2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 52, 36, 0);
pub const EMETER_VOLTAGE_SWELLS_L3: ObisIdentifier = ObisIdentifier::resolved(1, 0, 72, 36, 0);
pub const EMETER_INSTANT_VOLTAGE_L1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 32, 7, 0);
pub const EMETER_INSTANT_VOLTAGE_L2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 52, 7, 0);
pub const EMETER_INSTANT_VOLTAGE_L3: ObisIdentifier = ObisIdentifier::resolved(1, 0, 72, 7, 0);
pub const EMETER_INSTANT_CURRENT_L1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 31, 7, 0);
pub const EMETER_INSTANT_CURRENT_L2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 51, 7, 0);
pub const EMETER_INSTANT_CURRENT_L3: ObisIdentifier = ObisIdentifier::resolved(1, 0, 71, 7, 0);
pub const EMETER_INSTANT_POWER_DELIVERY_L1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 21, 7, 0);
pub const EMETER_INSTANT_POWER_DELIVERY_L2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 41, 7, 0);
pub const EMETER_INSTANT_POWER_DELIVERY_L3: ObisIdentifier = ObisIdentifier::resolved(1, 0, 61, 7, 0);
pub const EMETER_INSTANT_POWER_PRODUCTION_L1: ObisIdentifier = ObisIdentifier::resolved(1, 0, 22, 7, 0);
pub const EMETER_INSTANT_POWER_PRODUCTION_L2: ObisIdentifier = ObisIdentifier::resolved(1, 0, 42, 7, 0);
pub const EMETER_INSTANT_POWER_PRODUCTION_L3: ObisIdentifier = ObisIdentifier::resolved(1, 0, 62, 7, 0);

// e-MUCS (Belgium) additions
pub const EMETER_AVERAGE_DEMAND: ObisIdentifier = ObisIdentifier::resolved(1, 0, 1, 4, 0);
pub const EMETER_MAX_DEMAND_MONTH: ObisIdentifier = ObisIdentifier::resolved(1, 0, 1, 6, 0);
pub const EMETER_FUSE_SUPERVISION: ObisIdentifier = ObisIdentifier::resolved(1, 0, 31, 4, 0);

// M-Bus channels, group B is the channel
pub const MBUS_DEVICE_TYPE: ObisIdentifier = ObisIdentifier::template(0, 24, 1, 0);
pub const MBUS_EQUIPMENT_IDENTIFIER: ObisIdentifier = ObisIdentifier::template(0, 96, 1, 0);
pub const MBUS_EMUCS_EQUIPMENT_IDENTIFIER: ObisIdentifier = ObisIdentifier::template(0, 96, 1, 1);
pub const MBUS_READING: ObisIdentifier = ObisIdentifier::template(0, 24, 2, 1);
pub const MBUS_READING_UNCORRECTED: ObisIdentifier = ObisIdentifier::template(0, 24, 2, 3);
pub const MBUS_PROFILE_READING: ObisIdentifier = ObisIdentifier::template(0, 24, 3, 0);
pub const MBUS_VALVE_POSITION: ObisIdentifier = ObisIdentifier::template(0, 24, 4, 0);

pub static COSEM_OBJECT_TYPES: &[CosemObjectType] = &[
    CosemObjectType::new("p1_version", P1_VERSION, Quantity::Version, None, ValueRule::Text),
    CosemObjectType::new("p1_emucs_version", P1_EMUCS_VERSION, Quantity::Version, None, ValueRule::Text),
    CosemObjectType::new("timestamp", P1_TIMESTAMP, Quantity::Timestamp, None, ValueRule::Timestamp),
    CosemObjectType::new("text_code", P1_TEXT_CODE, Quantity::Text, None, ValueRule::HexText),
    CosemObjectType::new("text_message", P1_TEXT_STRING, Quantity::Text, None, ValueRule::HexText),

    CosemObjectType::new("equipment_identifier_v2", EMETER_EQUIPMENT_IDENTIFIER_V2, Quantity::EquipmentIdentifier, None, ValueRule::Text),
    CosemObjectType::new("equipment_identifier", EMETER_EQUIPMENT_IDENTIFIER, Quantity::EquipmentIdentifier, None, ValueRule::HexText),
    CosemObjectType::new("energy_delivered_t1", EMETER_DELIVERY_TARIFF1, Quantity::Energy, Some("kWh"), ValueRule::Decimal),
    CosemObjectType::new("energy_delivered_t2", EMETER_DELIVERY_TARIFF2, Quantity::Energy, Some("kWh"), ValueRule::Decimal),
    CosemObjectType::new("energy_produced_t1", EMETER_PRODUCTION_TARIFF1, Quantity::Energy, Some("kWh"), ValueRule::Decimal),
    CosemObjectType::new("energy_produced_t2", EMETER_PRODUCTION_TARIFF2, Quantity::Energy, Some("kWh"), ValueRule::Decimal),
    CosemObjectType::new("tariff_indicator", EMETER_TARIFF_INDICATOR, Quantity::TariffIndicator, None, ValueRule::Integer),
    CosemObjectType::new("power_delivered", EMETER_ACTUAL_DELIVERY, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("power_produced", EMETER_ACTUAL_PRODUCTION, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("power_threshold", EMETER_ACTUAL_THRESHOLD, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("switch_position", EMETER_SWITCH_POSITION, Quantity::SwitchPosition, None, ValueRule::State(SWITCH_STATES)),
    CosemObjectType::new("power_failures", EMETER_POWER_FAILURES, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("long_power_failures", EMETER_LONG_POWER_FAILURES, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("power_failure_log", EMETER_POWER_FAILURE_LOG, Quantity::EventLog, None, ValueRule::EventLog),
    CosemObjectType::new("voltage_sags_l1", EMETER_VOLTAGE_SAGS_L1, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("voltage_sags_l2", EMETER_VOLTAGE_SAGS_L2, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("voltage_sags_l3", EMETER_VOLTAGE_SAGS_L3, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("voltage_swells_l1", EMETER_VOLTAGE_SWELLS_L1, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("voltage_swells_l2", EMETER_VOLTAGE_SWELLS_L2, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("voltage_swells_l3", EMETER_VOLTAGE_SWELLS_L3, Quantity::Count, None, ValueRule::Integer),
    CosemObjectType::new("voltage_l1", EMETER_INSTANT_VOLTAGE_L1, Quantity::Voltage, Some("V"), ValueRule::Decimal),
    CosemObjectType::new("voltage_l2", EMETER_INSTANT_VOLTAGE_L2, Quantity::Voltage, Some("V"), ValueRule::Decimal),
    CosemObjectType::new("voltage_l3", EMETER_INSTANT_VOLTAGE_L3, Quantity::Voltage, Some("V"), ValueRule::Decimal),
    CosemObjectType::new("current_l1", EMETER_INSTANT_CURRENT_L1, Quantity::Current, Some("A"), ValueRule::Decimal),
    CosemObjectType::new("current_l2", EMETER_INSTANT_CURRENT_L2, Quantity::Current, Some("A"), ValueRule::Decimal),
    CosemObjectType::new("current_l3", EMETER_INSTANT_CURRENT_L3, Quantity::Current, Some("A"), ValueRule::Decimal),
    CosemObjectType::new("power_delivered_l1", EMETER_INSTANT_POWER_DELIVERY_L1, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("power_delivered_l2", EMETER_INSTANT_POWER_DELIVERY_L2, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("power_delivered_l3", EMETER_INSTANT_POWER_DELIVERY_L3, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("power_produced_l1", EMETER_INSTANT_POWER_PRODUCTION_L1, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("power_produced_l2", EMETER_INSTANT_POWER_PRODUCTION_L2, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("power_produced_l3", EMETER_INSTANT_POWER_PRODUCTION_L3, Quantity::Power, Some("kW"), ValueRule::Decimal),

    CosemObjectType::new("average_demand", EMETER_AVERAGE_DEMAND, Quantity::Power, Some("kW"), ValueRule::Decimal),
    CosemObjectType::new("max_demand_month", EMETER_MAX_DEMAND_MONTH, Quantity::Power, Some("kW"), ValueRule::TimestampedDecimal),
    CosemObjectType::new("fuse_supervision", EMETER_FUSE_SUPERVISION, Quantity::Current, Some("A"), ValueRule::Decimal),

    CosemObjectType::new("device_type", MBUS_DEVICE_TYPE, Quantity::DeviceType, None, ValueRule::Integer),
    CosemObjectType::new("equipment_identifier", MBUS_EQUIPMENT_IDENTIFIER, Quantity::EquipmentIdentifier, None, ValueRule::HexText),
    CosemObjectType::new("equipment_identifier", MBUS_EMUCS_EQUIPMENT_IDENTIFIER, Quantity::EquipmentIdentifier, None, ValueRule::HexText),
    CosemObjectType::new("reading", MBUS_READING, Quantity::MeterReading, None, ValueRule::TimestampedDecimal),
    CosemObjectType::new("reading_uncorrected", MBUS_READING_UNCORRECTED, Quantity::MeterReading, None, ValueRule::TimestampedDecimal),
    CosemObjectType::new("reading", MBUS_PROFILE_READING, Quantity::MeterReading, None, ValueRule::ProfileGeneric),
    CosemObjectType::new("valve_position", MBUS_VALVE_POSITION, Quantity::SwitchPosition, None, ValueRule::State(SWITCH_STATES)),
];

lazy_static! {
    static ref EXACT_TYPES: HashMap<ObisCode, &'static CosemObjectType> = COSEM_OBJECT_TYPES.iter()
        .filter(|t| !t.id.is_template())
        .map(|t| (t.id.pattern().canonical(), t))
        .collect();

    static ref TEMPLATE_TYPES: HashMap<ObisCode, &'static CosemObjectType> = COSEM_OBJECT_TYPES.iter()
        .filter(|t| t.id.is_template())
        .map(|t| (t.id.pattern().reduced(), t))
        .collect();
}

/// Exact match first, then the channel agnostic template match
pub fn lookup(code: &ObisCode) -> Option<&'static CosemObjectType> {
    let canonical = code.canonical();
    EXACT_TYPES.get(&canonical)
        .or_else(|| TEMPLATE_TYPES.get(&canonical.reduced()))
        .copied()
}

pub fn find_by_identifier(id: &ObisIdentifier) -> Option<&'static CosemObjectType> {
    COSEM_OBJECT_TYPES.iter().find(|t| t.id == *id)
}
