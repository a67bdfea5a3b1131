//! DSMR P1 bridge library
//!
//! Decodes DSMR smart meter telegrams, discovers the meters attached to the
//! P1 port (electricity plus M-Bus gas, water, heat and friends) and turns
//! their values into metering data for MQTT.

pub mod models;
pub mod mqtt;
pub mod config;
pub mod metering_dsmr;
pub mod obis_utils;

// Re-export common types for easier access
pub use models::DeviceProtocol;
pub use mqtt::{CALLBACKS, MeteringData};
pub use config::CONFIG;
pub use metering_dsmr::{DsmrError, DsmrManager};
pub use metering_dsmr::telegram::decode;
pub use metering_dsmr::detect::discover;

pub fn get_unix_ts() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::SystemTime::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

pub fn get_id(protocol: String, meter_name: &str) -> String {
    return format!("{}-{}-{:?}", protocol, meter_name, get_unix_ts());
}
