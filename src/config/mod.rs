use lazy_static::lazy_static;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_yml;
use std::error::Error;
use std::fs::File;
use std::io::prelude::*;
use std::path::Path;
use std::sync::RwLock;

fn mqtt_port_default() -> u16 { return 1883 }
fn mqtt_client_name_default() -> String { return "dsmr2mqtt".to_string() }
fn mqtt_topic_prefix_default() -> String { return "dsmr2mqtt".to_string() }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct MqttConfig {
    pub host: String,
    #[serde(default="mqtt_port_default")]
    pub port: u16,
    pub user: String,
    pub pass: String,
    #[serde(default="mqtt_client_name_default")]
    pub client_name: String,
    /// Every topic we publish or subscribe lives below this prefix
    #[serde(default="mqtt_topic_prefix_default")]
    pub topic_prefix: String,
}

fn dsmr_enabled_default() -> bool { return true }
fn dsmr_input_topic_default() -> String { return "dsmr_input".to_string() }
fn dsmr_channels_default() -> Vec<u8> { return Vec::new() }
fn dsmr_rediscover_default() -> bool { return true }
fn dsmr_stats_interval_default() -> u64 { return 60 }

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub struct DsmrConfig {
    #[serde(default="dsmr_enabled_default")]
    pub enabled: bool,
    /// Topic below the prefix that carries the raw telegram text
    #[serde(default="dsmr_input_topic_default")]
    pub input_topic: String,
    /// Channels physically present, empty means derive them from the telegram
    #[serde(default="dsmr_channels_default")]
    pub channels: Vec<u8>,
    /// Run discovery again when a telegram has objects no meter accepts
    #[serde(default="dsmr_rediscover_default")]
    pub rediscover: bool,
    /// Seconds between statistics publications
    #[serde(default="dsmr_stats_interval_default")]
    pub stats_interval: u64,
}

impl Default for DsmrConfig {
    fn default() -> Self {
        DsmrConfig {
            enabled: dsmr_enabled_default(),
            input_topic: dsmr_input_topic_default(),
            channels: dsmr_channels_default(),
            rediscover: dsmr_rediscover_default(),
            stats_interval: dsmr_stats_interval_default(),
        }
    }
}

fn dsmr_default() -> DsmrConfig { return DsmrConfig::default() }

#[derive(Deserialize, Serialize, Clone, Debug)]
pub struct Config {
    pub mqtt: MqttConfig,
    #[serde(default="dsmr_default")]
    pub dsmr: DsmrConfig,
}

pub struct ConfigHolder {
    pub config: Config,
}

pub enum ConfigBases {
    Mqtt(MqttConfig),
    Dsmr(DsmrConfig),
}

impl ConfigHolder {
    pub fn load() -> Self {
        /* Check for the two paths of the config file */
        for path in ["config/d2m.yaml", "d2m.yaml"] {
            if !Path::new(path).exists() {
                continue;
            }
            match Self::load_from(path) {
                Ok(holder) => return holder,
                Err(e) => panic!("Unable to load config file {path}: {e}"),
            }
        }
        panic!("Unable to read the config on config/d2m.yaml or d2m.yaml");
    }

    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn Error>> {
        let mut file = File::open(path.as_ref())?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;

        let config: Config = serde_yml::from_str(&contents)?;
        info!("Loaded config from {}", path.as_ref().display());
        debug!("DSMR config: {:?}", config.dsmr);

        Ok(ConfigHolder { config })
    }

    pub fn get_copy(&self, base: &str) -> Result<ConfigBases, Box<dyn Error>> {
        match base {
            "mqtt" => { return Ok(ConfigBases::Mqtt(self.config.mqtt.clone())) },
            "dsmr" => { return Ok(ConfigBases::Dsmr(self.config.dsmr.clone())) },
            _ => { Err(format!("Type {base} not known"))? }
        }
    }

    pub fn get_complete_config(&self) -> Config {
        return self.config.clone();
    }
}

lazy_static! {
    pub static ref CONFIG: RwLock<ConfigHolder> = RwLock::new(ConfigHolder::load());
}

#[macro_export]
macro_rules! get_config_or_panic {
    ($base: expr, $pat: path) => {
        {
            let c = $crate::CONFIG.read()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .get_copy($base)
                .unwrap_or_else(|e| panic!("config section {} is missing: {}", $base, e));
            if let $pat(a) = c {
                a
            } else {
                panic!(
                    "mismatch variant when cast to {}",
                    stringify!($pat));
            }
        }
    };
}
