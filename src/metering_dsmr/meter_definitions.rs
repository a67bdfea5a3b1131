use crate::obis_utils::ObisIdentifier;
use super::cosem_catalog::*;
use super::structs::{MeterKind, MeterTypeDefinition};

// M-Bus device type codes (EN 13757-3) reported in 0-n:24.1.0
pub const DEVICE_TYPE_GAS: u8 = 0x03;
pub const DEVICE_TYPES_WATER: &[u8] = &[0x06, 0x07, 0x15, 0x16];
pub const DEVICE_TYPES_HEAT: &[u8] = &[0x04, 0x0C, 0x0D];
pub const DEVICE_TYPES_COOLING: &[u8] = &[0x0A, 0x0B];
pub const DEVICE_TYPES_GENERIC: &[u8] = &[0x00, 0x01, 0x02, 0x05, 0x08, 0x09, 0x0E, 0x0F];
/// Breakers, valves and repeaters, they have no register of their own
pub const DEVICE_TYPES_NO_REGISTER: &[u8] = &[0x20, 0x21, 0x31, 0x32, 0x33, 0x36, 0x37];

const ENERGY_REGISTERS: [ObisIdentifier; 8] = [
    EMETER_DELIVERY_TARIFF1,
    EMETER_DELIVERY_TARIFF2,
    EMETER_PRODUCTION_TARIFF1,
    EMETER_PRODUCTION_TARIFF2,
    EMETER_TARIFF_INDICATOR,
    EMETER_ACTUAL_DELIVERY,
    EMETER_ACTUAL_PRODUCTION,
    EMETER_EQUIPMENT_IDENTIFIER,
];

pub static ELECTRICITY_BASIC: MeterTypeDefinition = MeterTypeDefinition {
    name: "electricity_basic",
    kind: MeterKind::MainElectricity,
    identifier: None,
    required: &[EMETER_DELIVERY_TARIFF1, EMETER_DELIVERY_TARIFF2],
    optional: &[
        EMETER_PRODUCTION_TARIFF1,
        EMETER_PRODUCTION_TARIFF2,
        EMETER_TARIFF_INDICATOR,
        EMETER_ACTUAL_DELIVERY,
        EMETER_ACTUAL_PRODUCTION,
    ],
    device_types: &[],
};

pub static ELECTRICITY_V2_1: MeterTypeDefinition = MeterTypeDefinition {
    name: "electricity_v2_1",
    kind: MeterKind::MainElectricity,
    identifier: Some(EMETER_EQUIPMENT_IDENTIFIER_V2),
    required: &[
        EMETER_EQUIPMENT_IDENTIFIER_V2,
        EMETER_DELIVERY_TARIFF1,
        EMETER_DELIVERY_TARIFF2,
        EMETER_PRODUCTION_TARIFF1,
        EMETER_PRODUCTION_TARIFF2,
        EMETER_TARIFF_INDICATOR,
        EMETER_ACTUAL_DELIVERY,
        EMETER_ACTUAL_PRODUCTION,
    ],
    optional: &[],
    device_types: &[],
};

pub static ELECTRICITY_V3_0: MeterTypeDefinition = MeterTypeDefinition {
    name: "electricity_v3_0",
    kind: MeterKind::MainElectricity,
    identifier: Some(EMETER_EQUIPMENT_IDENTIFIER),
    required: &ENERGY_REGISTERS,
    optional: &[EMETER_ACTUAL_THRESHOLD, EMETER_SWITCH_POSITION, P1_TEXT_CODE, P1_TEXT_STRING],
    device_types: &[],
};

pub static ELECTRICITY_V4_2: MeterTypeDefinition = MeterTypeDefinition {
    name: "electricity_v4_2",
    kind: MeterKind::MainElectricity,
    identifier: Some(EMETER_EQUIPMENT_IDENTIFIER),
    required: &[
        P1_VERSION,
        P1_TIMESTAMP,
        EMETER_EQUIPMENT_IDENTIFIER,
        EMETER_DELIVERY_TARIFF1,
        EMETER_DELIVERY_TARIFF2,
        EMETER_PRODUCTION_TARIFF1,
        EMETER_PRODUCTION_TARIFF2,
        EMETER_TARIFF_INDICATOR,
        EMETER_ACTUAL_DELIVERY,
        EMETER_ACTUAL_PRODUCTION,
        EMETER_POWER_FAILURES,
        EMETER_LONG_POWER_FAILURES,
        EMETER_POWER_FAILURE_LOG,
        EMETER_VOLTAGE_SAGS_L1,
        EMETER_VOLTAGE_SWELLS_L1,
        EMETER_INSTANT_CURRENT_L1,
        EMETER_INSTANT_POWER_DELIVERY_L1,
        EMETER_INSTANT_POWER_PRODUCTION_L1,
    ],
    optional: &[
        EMETER_ACTUAL_THRESHOLD,
        EMETER_SWITCH_POSITION,
        P1_TEXT_CODE,
        P1_TEXT_STRING,
        EMETER_VOLTAGE_SAGS_L2,
        EMETER_VOLTAGE_SAGS_L3,
        EMETER_VOLTAGE_SWELLS_L2,
        EMETER_VOLTAGE_SWELLS_L3,
        EMETER_INSTANT_CURRENT_L2,
        EMETER_INSTANT_CURRENT_L3,
        EMETER_INSTANT_POWER_DELIVERY_L2,
        EMETER_INSTANT_POWER_DELIVERY_L3,
        EMETER_INSTANT_POWER_PRODUCTION_L2,
        EMETER_INSTANT_POWER_PRODUCTION_L3,
    ],
    device_types: &[],
};

pub static ELECTRICITY_V5_0: MeterTypeDefinition = MeterTypeDefinition {
    name: "electricity_v5_0",
    kind: MeterKind::MainElectricity,
    identifier: Some(EMETER_EQUIPMENT_IDENTIFIER),
    required: &[
        P1_VERSION,
        P1_TIMESTAMP,
        EMETER_EQUIPMENT_IDENTIFIER,
        EMETER_DELIVERY_TARIFF1,
        EMETER_DELIVERY_TARIFF2,
        EMETER_PRODUCTION_TARIFF1,
        EMETER_PRODUCTION_TARIFF2,
        EMETER_TARIFF_INDICATOR,
        EMETER_ACTUAL_DELIVERY,
        EMETER_ACTUAL_PRODUCTION,
        EMETER_POWER_FAILURES,
        EMETER_LONG_POWER_FAILURES,
        EMETER_POWER_FAILURE_LOG,
        EMETER_VOLTAGE_SAGS_L1,
        EMETER_VOLTAGE_SWELLS_L1,
        EMETER_INSTANT_VOLTAGE_L1,
        EMETER_INSTANT_CURRENT_L1,
        EMETER_INSTANT_POWER_DELIVERY_L1,
        EMETER_INSTANT_POWER_PRODUCTION_L1,
    ],
    optional: &[
        EMETER_ACTUAL_THRESHOLD,
        EMETER_SWITCH_POSITION,
        P1_TEXT_CODE,
        P1_TEXT_STRING,
        EMETER_VOLTAGE_SAGS_L2,
        EMETER_VOLTAGE_SAGS_L3,
        EMETER_VOLTAGE_SWELLS_L2,
        EMETER_VOLTAGE_SWELLS_L3,
        EMETER_INSTANT_VOLTAGE_L2,
        EMETER_INSTANT_VOLTAGE_L3,
        EMETER_INSTANT_CURRENT_L2,
        EMETER_INSTANT_CURRENT_L3,
        EMETER_INSTANT_POWER_DELIVERY_L2,
        EMETER_INSTANT_POWER_DELIVERY_L3,
        EMETER_INSTANT_POWER_PRODUCTION_L2,
        EMETER_INSTANT_POWER_PRODUCTION_L3,
    ],
    device_types: &[],
};

pub static ELECTRICITY_EMUCS_V1_0: MeterTypeDefinition = MeterTypeDefinition {
    name: "electricity_emucs_v1_0",
    kind: MeterKind::MainElectricity,
    identifier: Some(EMETER_EQUIPMENT_IDENTIFIER),
    required: &[
        P1_EMUCS_VERSION,
        P1_TIMESTAMP,
        EMETER_EQUIPMENT_IDENTIFIER,
        EMETER_DELIVERY_TARIFF1,
        EMETER_DELIVERY_TARIFF2,
        EMETER_PRODUCTION_TARIFF1,
        EMETER_PRODUCTION_TARIFF2,
        EMETER_TARIFF_INDICATOR,
        EMETER_ACTUAL_DELIVERY,
        EMETER_ACTUAL_PRODUCTION,
        EMETER_INSTANT_VOLTAGE_L1,
        EMETER_INSTANT_CURRENT_L1,
    ],
    optional: &[
        EMETER_AVERAGE_DEMAND,
        EMETER_MAX_DEMAND_MONTH,
        EMETER_SWITCH_POSITION,
        EMETER_ACTUAL_THRESHOLD,
        EMETER_FUSE_SUPERVISION,
        P1_TEXT_STRING,
        EMETER_INSTANT_VOLTAGE_L2,
        EMETER_INSTANT_VOLTAGE_L3,
        EMETER_INSTANT_CURRENT_L2,
        EMETER_INSTANT_CURRENT_L3,
        EMETER_INSTANT_POWER_DELIVERY_L1,
        EMETER_INSTANT_POWER_DELIVERY_L2,
        EMETER_INSTANT_POWER_DELIVERY_L3,
        EMETER_INSTANT_POWER_PRODUCTION_L1,
        EMETER_INSTANT_POWER_PRODUCTION_L2,
        EMETER_INSTANT_POWER_PRODUCTION_L3,
    ],
    device_types: &[],
};

/// A reading on an M-Bus channel without any device type is assumed to be gas
pub static GAS_BASIC: MeterTypeDefinition = MeterTypeDefinition {
    name: "gas_basic",
    kind: MeterKind::Gas,
    identifier: None,
    required: &[MBUS_READING],
    optional: &[],
    device_types: &[DEVICE_TYPE_GAS],
};

pub static GAS_V2_1: MeterTypeDefinition = MeterTypeDefinition {
    name: "gas_v2_1",
    kind: MeterKind::Gas,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_EQUIPMENT_IDENTIFIER, MBUS_PROFILE_READING],
    optional: &[MBUS_DEVICE_TYPE, MBUS_VALVE_POSITION],
    device_types: &[DEVICE_TYPE_GAS],
};

pub static GAS_V4_V5: MeterTypeDefinition = MeterTypeDefinition {
    name: "gas_v4_v5",
    kind: MeterKind::Gas,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EQUIPMENT_IDENTIFIER, MBUS_READING],
    optional: &[MBUS_VALVE_POSITION],
    device_types: &[DEVICE_TYPE_GAS],
};

pub static GAS_EMUCS_V1_0: MeterTypeDefinition = MeterTypeDefinition {
    name: "gas_emucs_v1_0",
    kind: MeterKind::Gas,
    identifier: Some(MBUS_EMUCS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EMUCS_EQUIPMENT_IDENTIFIER, MBUS_READING_UNCORRECTED],
    optional: &[MBUS_VALVE_POSITION, MBUS_READING],
    device_types: &[DEVICE_TYPE_GAS],
};

pub static WATER_V4_V5: MeterTypeDefinition = MeterTypeDefinition {
    name: "water_v4_v5",
    kind: MeterKind::Water,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EQUIPMENT_IDENTIFIER, MBUS_READING],
    optional: &[MBUS_VALVE_POSITION],
    device_types: DEVICE_TYPES_WATER,
};

pub static HEAT_V4_V5: MeterTypeDefinition = MeterTypeDefinition {
    name: "heat_v4_v5",
    kind: MeterKind::Heat,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EQUIPMENT_IDENTIFIER, MBUS_READING],
    optional: &[],
    device_types: DEVICE_TYPES_HEAT,
};

pub static COOLING_V4_V5: MeterTypeDefinition = MeterTypeDefinition {
    name: "cooling_v4_v5",
    kind: MeterKind::Cooling,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EQUIPMENT_IDENTIFIER, MBUS_READING],
    optional: &[],
    device_types: DEVICE_TYPES_COOLING,
};

pub static GENERIC_V3_0: MeterTypeDefinition = MeterTypeDefinition {
    name: "generic_v3_0",
    kind: MeterKind::Generic,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EQUIPMENT_IDENTIFIER, MBUS_PROFILE_READING],
    optional: &[MBUS_VALVE_POSITION],
    device_types: DEVICE_TYPES_GENERIC,
};

pub static GENERIC_V4_V5: MeterTypeDefinition = MeterTypeDefinition {
    name: "generic_v4_v5",
    kind: MeterKind::Generic,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EQUIPMENT_IDENTIFIER, MBUS_READING],
    optional: &[MBUS_VALVE_POSITION],
    device_types: DEVICE_TYPES_GENERIC,
};

pub static MBUS_DEVICE: MeterTypeDefinition = MeterTypeDefinition {
    name: "mbus_device",
    kind: MeterKind::Device,
    identifier: Some(MBUS_EQUIPMENT_IDENTIFIER),
    required: &[MBUS_DEVICE_TYPE, MBUS_EQUIPMENT_IDENTIFIER],
    optional: &[MBUS_VALVE_POSITION],
    device_types: DEVICE_TYPES_NO_REGISTER,
};

pub static METER_TYPES: &[&MeterTypeDefinition] = &[
    &ELECTRICITY_BASIC,
    &ELECTRICITY_V2_1,
    &ELECTRICITY_V3_0,
    &ELECTRICITY_V4_2,
    &ELECTRICITY_V5_0,
    &ELECTRICITY_EMUCS_V1_0,
    &GAS_BASIC,
    &GAS_V2_1,
    &GAS_V4_V5,
    &GAS_EMUCS_V1_0,
    &WATER_V4_V5,
    &HEAT_V4_V5,
    &COOLING_V4_V5,
    &GENERIC_V3_0,
    &GENERIC_V4_V5,
    &MBUS_DEVICE,
];

pub fn find_meter_type(name: &str) -> Option<&'static MeterTypeDefinition> {
    METER_TYPES.iter().copied().find(|d| d.name == name)
}
