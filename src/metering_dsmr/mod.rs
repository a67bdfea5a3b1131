use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use crate::config::{ConfigBases, DsmrConfig};
use crate::models::DeviceProtocol;
use crate::mqtt::{publish_protocol_count, publish_protocol_value, SubscribeData, Transmission};
use crate::obis_utils::{ObisCode, ObisCodeError};
use crate::{get_config_or_panic, get_unix_ts, MeteringData};
use log::{debug, error, info, warn};
use serde::Serialize;
use tokio::sync::mpsc::Sender;
use thiserror::Error;

pub mod structs;
pub mod values;
pub mod cosem_catalog;
pub mod cosem_parser;
pub mod telegram;
pub mod meter_definitions;
pub mod detect;
pub mod meter;

#[cfg(test)]
mod test_telegrams;

use cosem_catalog::P1_TIMESTAMP;
use detect::{discover, telegram_channels};
use meter::{MeterListener, MeterRegistry, MeteringCollector};
use structs::{CosemObject, CosemValue, MeterDescriptor, P1Header};
use telegram::{decode, TelegramBuffer};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DsmrError {
    #[error("Telegram framing error: {0}")]
    Framing(String),
    #[error("Checksum mismatch, telegram says {expected:04X} but computed {computed:04X}")]
    Checksum { expected: u16, computed: u16 },
    #[error("Unable to decode value of {obis}: {reason}")]
    ValueDecode { obis: String, reason: String },
    #[error(transparent)]
    InvalidObisCode(#[from] ObisCodeError),
    #[error("Invalid data line format")]
    InvalidDataLine,
    #[error("Channel {channel} matches more than one meter type: {candidates:?}")]
    AmbiguousKind { channel: u8, candidates: Vec<String> },
}

/// Counters published below `mgt/dsmr`
#[derive(Debug, Default, Clone, PartialEq, Serialize)]
pub struct TelegramStats {
    pub telegrams: u64,
    pub framing_errors: u64,
    /// Corrupted telegrams
    pub checksum_errors: u64,
    pub value_errors: u64,
    pub discoveries: u64,
}

impl TelegramStats {
    fn record_error(&mut self, e: &DsmrError) {
        match e {
            DsmrError::Framing(_) => self.framing_errors += 1,
            DsmrError::Checksum { .. } => self.checksum_errors += 1,
            DsmrError::ValueDecode { .. } | DsmrError::InvalidDataLine | DsmrError::InvalidObisCode(_) => self.value_errors += 1,
            DsmrError::AmbiguousKind { .. } => {}
        }
    }
}

pub struct DsmrManager {
    sender: Sender<Transmission>,
    config: DsmrConfig,
    topic_prefix: String,
    buffer: TelegramBuffer,
    registry: Arc<MeterRegistry>,
    collectors: HashMap<MeterDescriptor, Arc<MeteringCollector>>,
    /// Known objects no meter accepted after the last discovery
    unresolved: Option<BTreeSet<ObisCode>>,
    stats: TelegramStats,
}

impl DsmrManager {
    pub fn new(sender: Sender<Transmission>) -> Self {
        let config = get_config_or_panic!("dsmr", ConfigBases::Dsmr);
        let mqtt = get_config_or_panic!("mqtt", ConfigBases::Mqtt);
        Self::with_config(sender, config, mqtt.topic_prefix)
    }

    pub fn with_config(sender: Sender<Transmission>, config: DsmrConfig, topic_prefix: String) -> Self {
        Self {
            sender,
            config,
            topic_prefix,
            buffer: TelegramBuffer::new(),
            registry: Arc::new(MeterRegistry::new()),
            collectors: HashMap::new(),
            unresolved: None,
            stats: TelegramStats::default(),
        }
    }

    pub fn registry(&self) -> Arc<MeterRegistry> {
        self.registry.clone()
    }

    pub fn stats(&self) -> &TelegramStats {
        &self.stats
    }

    pub async fn start_thread(&mut self) {
        info!("Starting DSMR thread");

        let (sender, mut receiver) = tokio::sync::mpsc::channel(10);

        let register = Transmission::Subscribe(SubscribeData {
            topic: self.config.input_topic.clone(),
            sender,
        });

        let _ = self.sender.send(register).await;

        let mut stats_timer = tokio::time::interval(Duration::from_secs(self.config.stats_interval.max(1)));

        info!("Starting DSMR waiting for telegrams");
        loop {
            tokio::select! {
                message = receiver.recv() => {
                    let Some(payload) = message else {
                        info!("DSMR input closed, exiting");
                        break;
                    };
                    debug!("Received {} bytes of DSMR data", payload.len());
                    self.handle_payload(&payload).await;
                }
                _ = stats_timer.tick() => {
                    self.publish_stats().await;
                }
            }
        }
    }

    /// Feeds a chunk of the P1 stream and forwards the values of every
    /// completed telegram
    pub async fn handle_payload(&mut self, payload: &[u8]) {
        for frame in self.buffer.push(payload) {
            match frame {
                Ok(raw) => {
                    for metering_data in self.process_frame(&raw) {
                        let _ = self.sender.send(Transmission::Metering(metering_data)).await;
                    }
                }
                Err(e) => {
                    warn!("Dropping DSMR data: {}", e);
                    self.stats.record_error(&e);
                }
            }
        }
    }

    /// Decodes one telegram, updates the meters and returns one
    /// `MeteringData` per meter that received values
    pub fn process_frame(&mut self, raw: &[u8]) -> Vec<MeteringData> {
        let telegram = match decode(raw) {
            Ok(t) => t,
            Err(e) => {
                error!("DSMR telegram rejected: {}", e);
                self.stats.record_error(&e);
                return Vec::new();
            }
        };

        self.stats.telegrams += 1;
        for e in &telegram.line_errors {
            self.stats.record_error(e);
        }

        if self.needs_discovery(&telegram.objects) {
            self.run_discovery(&telegram.objects);
        }

        let accepted = self.registry.dispatch(&telegram.objects);
        debug!("{} of {} objects accepted by {} meter(s)", accepted, telegram.objects.len(), self.registry.len());

        let metered_time = telegram_time(&telegram.objects).unwrap_or_else(get_unix_ts);
        let mut result = Vec::new();
        for descriptor in self.registry.descriptors() {
            let Some(collector) = self.collectors.get(&descriptor) else {
                continue;
            };
            let Some(mut values) = collector.take_values() else {
                continue;
            };

            values.insert("proto".to_string(), proto_map(&telegram.header, &descriptor, &telegram.objects).into());

            let mut mr = MeteringData::new(DeviceProtocol::DSMR, descriptor.meter_name());
            mr.metered_time = metered_time;
            mr.metered_values = values;
            result.push(mr);
        }
        result
    }

    /// Discovery runs for the first telegram and again whenever the set of
    /// known objects without a meter changes
    fn needs_discovery(&self, objects: &[CosemObject]) -> bool {
        if !self.registry.is_empty() && !self.config.rediscover {
            return false;
        }

        let unresolved = self.unresolved_objects(objects);
        if unresolved.is_empty() && !self.registry.is_empty() {
            return false;
        }
        self.unresolved.as_ref() != Some(&unresolved)
    }

    fn unresolved_objects(&self, objects: &[CosemObject]) -> BTreeSet<ObisCode> {
        objects.iter()
            .filter(|o| o.is_known() && !self.registry.is_supported(&o.obis))
            .map(|o| o.obis.canonical())
            .collect()
    }

    fn run_discovery(&mut self, objects: &[CosemObject]) {
        let channels: BTreeSet<u8> = if self.config.channels.is_empty() {
            telegram_channels(objects)
        } else {
            self.config.channels.iter().copied().collect()
        };

        let found = discover(objects, &channels);
        self.stats.discoveries += 1;

        let collectors = &mut self.collectors;
        let changes = self.registry.apply_discovery(&found, |descriptor| {
            let collector = Arc::new(MeteringCollector::new(*descriptor));
            collectors.insert(*descriptor, collector.clone());
            let listener: Arc<dyn MeterListener> = collector;
            listener
        });

        for (previous, _) in &changes.replaced {
            self.collectors.remove(previous);
        }

        if !self.config.channels.is_empty() {
            for removed in self.registry.retain_channels(&channels) {
                self.collectors.remove(&removed);
            }
        }

        self.unresolved = Some(self.unresolved_objects(objects));

        if !changes.is_empty() {
            info!("DSMR meters now: {:?}", self.registry.descriptors().iter().map(|d| d.to_string()).collect::<Vec<_>>());
        }
    }

    async fn publish_stats(&self) {
        let prefix = &self.topic_prefix;
        publish_protocol_count(&self.sender, prefix, "dsmr", self.registry.len() as u64).await;

        if let Ok(serde_json::Value::Object(stats)) = serde_json::to_value(&self.stats) {
            for (name, value) in stats {
                publish_protocol_value(&self.sender, prefix, "dsmr", &name, value.to_string()).await;
            }
        }
    }
}

/// Unix time of the telegram timestamp (0-0:1.0.0), if the meter sends one
fn telegram_time(objects: &[CosemObject]) -> Option<u64> {
    objects.iter()
        .find(|o| P1_TIMESTAMP.matches(&o.obis))
        .and_then(|o| match o.value {
            CosemValue::Timestamp(at) => u64::try_from(at.timestamp()).ok(),
            _ => None,
        })
}

fn proto_map(header: &P1Header, descriptor: &MeterDescriptor, objects: &[CosemObject]) -> serde_json::Map<String, serde_json::Value> {
    let mut protocol_map = serde_json::Map::new();
    protocol_map.insert("type".to_string(), "dsmr".into());
    protocol_map.insert("manufacturer".to_string(), header.manufacturer.clone().into());
    protocol_map.insert("identification".to_string(), header.identification.clone().into());
    protocol_map.insert("meter_type".to_string(), descriptor.meter_type.name.into());
    protocol_map.insert("channel".to_string(), descriptor.channel.into());
    if let Some(serial) = descriptor.serial(objects) {
        protocol_map.insert("serial".to_string(), serial.into());
    }
    protocol_map
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metering_dsmr::structs::MeterKind;
    use crate::metering_dsmr::test_telegrams::*;
    use tokio::sync::mpsc::Receiver;

    fn manager(config: DsmrConfig) -> (DsmrManager, Receiver<Transmission>) {
        let (tx, rx) = tokio::sync::mpsc::channel(32);
        (DsmrManager::with_config(tx, config, "dsmr2mqtt".to_string()), rx)
    }

    fn metering(rx: &mut Receiver<Transmission>) -> Vec<MeteringData> {
        let mut result = Vec::new();
        while let Ok(t) = rx.try_recv() {
            if let Transmission::Metering(data) = t {
                result.push(data);
            }
        }
        result
    }

    #[tokio::test]
    async fn test_telegram_becomes_metering_data() {
        let (mut manager, mut rx) = manager(DsmrConfig::default());
        manager.handle_payload(&telegram(GAS_BASIC, GAS_BASIC_CRC)).await;

        let data = metering(&mut rx);
        let names: Vec<&str> = data.iter().map(|d| d.meter_name.as_str()).collect();
        assert_eq!(names, vec!["main_electricity_0", "gas_1"]);

        let electricity = &data[0];
        assert_eq!(electricity.protocol, DeviceProtocol::DSMR);
        assert_eq!(electricity.metered_values["energy_delivered_t1"], serde_json::json!(441.226));
        assert_eq!(electricity.metered_values["energy_delivered_t1_unit"], "kWh");
        assert_eq!(electricity.metered_values["proto"]["manufacturer"], "XMX");
        assert_eq!(electricity.metered_values["proto"]["meter_type"], "electricity_basic");

        let gas = &data[1];
        assert_eq!(gas.metered_values["reading"], serde_json::json!(12.345));
        assert_eq!(gas.metered_values["proto"]["channel"], 1);
        assert_eq!(manager.stats().telegrams, 1);
        assert_eq!(manager.stats().discoveries, 1);
    }

    #[tokio::test]
    async fn test_meters_are_discovered_once() {
        let (mut manager, mut rx) = manager(DsmrConfig::default());
        let raw = telegram(DSMR_V5, DSMR_V5_CRC);
        manager.handle_payload(&raw).await;
        manager.handle_payload(&raw).await;

        assert_eq!(metering(&mut rx).len(), 4);
        assert_eq!(manager.stats().telegrams, 2);
        assert_eq!(manager.stats().discoveries, 1);
        assert_eq!(manager.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_metered_time_comes_from_the_telegram() {
        let (mut manager, _rx) = manager(DsmrConfig::default());
        let data = manager.process_frame(&telegram(DSMR_V5, DSMR_V5_CRC));
        // 2010-12-09 11:30:20 +01:00
        assert!(data.iter().all(|d| d.metered_time == 1291890620));
    }

    #[tokio::test]
    async fn test_more_specific_telegram_upgrades_the_meter() {
        let (mut manager, _rx) = manager(DsmrConfig::default());
        manager.process_frame(&telegram(BASIC, BASIC_CRC));
        assert_eq!(manager.registry().descriptors()[0].meter_type.name, "electricity_basic");

        manager.process_frame(&telegram(DSMR_V5, DSMR_V5_CRC));
        let names: Vec<String> = manager.registry().descriptors().iter().map(|d| d.to_string()).collect();
        assert_eq!(names, vec!["electricity_v5_0@0", "gas_v4_v5@1"]);
        assert_eq!(manager.collectors.len(), 2);
    }

    #[tokio::test]
    async fn test_channel_keeps_a_single_meter_kind() {
        let (mut manager, _rx) = manager(DsmrConfig::default());
        manager.process_frame(&telegram(GAS_BASIC, GAS_BASIC_CRC));
        assert!(manager.registry().get(MeterKind::Gas, 1).is_some());

        let data = manager.process_frame(&signed_telegram(WATER_UPGRADE));
        let registered: Vec<String> = manager.registry().descriptors().iter().map(|d| d.to_string()).collect();
        assert_eq!(registered, vec!["electricity_basic@0", "water_v4_v5@1"]);

        let names: Vec<&str> = data.iter().map(|d| d.meter_name.as_str()).collect();
        assert_eq!(names, vec!["main_electricity_0", "water_1"]);
        assert_eq!(manager.collectors.len(), 2);
        assert_eq!(manager.stats().discoveries, 2);
    }

    #[tokio::test]
    async fn test_serial_is_published() {
        let (mut manager, _rx) = manager(DsmrConfig::default());
        let data = manager.process_frame(&telegram(MULTI, MULTI_CRC));

        let names: Vec<&str> = data.iter().map(|d| d.meter_name.as_str()).collect();
        assert_eq!(names, vec!["main_electricity_0", "gas_1", "water_2"]);
        assert!(data[0].metered_values["proto"].get("serial").is_none());
        assert_eq!(data[1].metered_values["proto"]["serial"], "2222ABCD123456789");
        assert_eq!(data[2].metered_values["proto"]["serial"], "3333ABCD123456789");
    }

    #[tokio::test]
    async fn test_unmatched_channel_is_not_rediscovered() {
        let (mut manager, _rx) = manager(DsmrConfig::default());
        let raw = signed_telegram(UNKNOWN_DEVICE);
        manager.process_frame(&raw);
        manager.process_frame(&raw);
        assert_eq!(manager.stats().discoveries, 1);
        assert_eq!(manager.registry().len(), 1);

        manager.process_frame(&signed_telegram(WATER_UPGRADE));
        assert_eq!(manager.stats().discoveries, 2);
        assert_eq!(manager.registry().len(), 2);
    }

    #[tokio::test]
    async fn test_configured_channels_limit_discovery() {
        let config = DsmrConfig { channels: vec![0, 2], ..DsmrConfig::default() };
        let (mut manager, _rx) = manager(config);
        let data = manager.process_frame(&telegram(MULTI, MULTI_CRC));

        let names: Vec<&str> = data.iter().map(|d| d.meter_name.as_str()).collect();
        assert_eq!(names, vec!["main_electricity_0", "water_2"]);
    }

    #[tokio::test]
    async fn test_errors_are_counted() {
        let (mut manager, mut rx) = manager(DsmrConfig::default());
        manager.handle_payload(&telegram(BASIC, "1234")).await;
        manager.handle_payload(&telegram(BAD_VALUE, BAD_VALUE_CRC)).await;

        assert_eq!(manager.stats().checksum_errors, 1);
        assert_eq!(manager.stats().value_errors, 2);
        assert_eq!(manager.stats().telegrams, 1);
        assert_eq!(metering(&mut rx).len(), 1);
    }

    #[tokio::test]
    async fn test_thread_subscribes_and_publishes() {
        let (tx, mut rx) = tokio::sync::mpsc::channel(32);
        let mut manager = DsmrManager::with_config(tx, DsmrConfig::default(), "dsmr2mqtt".to_string());
        let task = tokio::spawn(async move { manager.start_thread().await });

        let input = loop {
            match rx.recv().await.unwrap() {
                Transmission::Subscribe(s) => {
                    assert_eq!(s.topic, "dsmr_input");
                    break s.sender;
                }
                _ => continue,
            }
        };

        let raw = telegram(BASIC, BASIC_CRC);
        let (first, second) = raw.split_at(20);
        input.send(first.to_vec()).await.unwrap();
        input.send(second.to_vec()).await.unwrap();

        let data = loop {
            match rx.recv().await.unwrap() {
                Transmission::Metering(data) => break data,
                _ => continue,
            }
        };
        assert_eq!(data.meter_name, "main_electricity_0");

        drop(input);
        task.await.unwrap();
    }
}
