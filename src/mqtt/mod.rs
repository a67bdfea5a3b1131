use std::collections::HashMap;
use lazy_static::lazy_static;
use tokio::sync::RwLock;
use crate::config::{ConfigBases, MqttConfig};
use crate::models::DeviceProtocol;
use crate::{get_config_or_panic, get_unix_ts};
use log::{debug, error, info};
use tokio::sync::mpsc::{Receiver, Sender};
use serde::{Serialize, Deserialize};
use serde_json;
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum TransmissionValueType {
    Now,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeteringData {
    pub id: String,
    pub meter_name: String,
    pub tenant: String,
    pub protocol: DeviceProtocol,
    pub transmission_time: u64,
    pub transmission_type: TransmissionValueType,
    pub metered_time: u64,
    pub metered_values: serde_json::Map<String, serde_json::Value>
}

impl MeteringData {
    pub fn new(protocol: DeviceProtocol, meter_name: String) -> Self {
        let now = get_unix_ts();
        MeteringData {
            id: crate::get_id(protocol.as_topic().to_string(), &meter_name),
            tenant: "".to_string(),
            meter_name,
            protocol,
            transmission_time: now,
            transmission_type: TransmissionValueType::Now,
            metered_time: now,
            metered_values: serde_json::Map::new()
        }
    }
}

#[derive(Debug, Clone)]
pub struct PublishData {
    pub topic: String,
    pub payload: String,
    pub qos: u8,
    pub retain: bool,
}

/// Raw payloads of `topic` (below the prefix) are forwarded to `sender`
pub struct SubscribeData {
    pub topic: String,
    pub sender: Sender<Vec<u8>>
}

pub enum Transmission {
    Metering(MeteringData),
    Subscribe(SubscribeData),
    Publish(PublishData)
}

pub struct MqttManager {
    rx: Receiver<Transmission>,
    exit_thread: bool,
    client: AsyncClient,
    topic_prefix: String,
}

pub struct Callbacks {
    calls: HashMap<String, Vec<Sender<Vec<u8>>>>,
}

impl Callbacks {
    pub fn new() -> Self {
        return Callbacks { calls: HashMap::new() };
    }

    pub fn insert(&mut self, topic: String, callback: Sender<Vec<u8>>) {
        debug!("Adding callback for topic {topic}");
        self.calls.entry(topic).or_default().push(callback);
    }

    pub async fn send(&self, topic: &str, payload: &[u8]) {
        let Some(v) = self.calls.get(topic) else {
            debug!("Send for unknown topic {topic}");
            return;
        };

        for call in v {
            debug!("Sending {} bytes to callback of {topic}", payload.len());
            if let Err(e) = call.send(payload.to_vec()).await {
                error!("Callback for {topic} is gone: {e}");
            }
        }
    }

    pub fn get_topics(&self) -> Vec<String> {
        self.calls.keys().cloned().collect()
    }
}

impl Default for Callbacks {
    fn default() -> Self {
        Self::new()
    }
}

lazy_static! {
    pub static ref CALLBACKS: RwLock<Callbacks> = RwLock::new(Callbacks::new());
}

fn qos_from_u8(qos: u8) -> QoS {
    match qos {
        0 => QoS::AtMostOnce,
        1 => QoS::AtLeastOnce,
        2 => QoS::ExactlyOnce,
        _ => QoS::AtMostOnce,
    }
}

impl MqttManager {
    pub fn new() -> (Self, Sender<Transmission>) {
        let config = get_config_or_panic!("mqtt", ConfigBases::Mqtt);
        Self::with_config(&config)
    }

    pub fn with_config(config: &MqttConfig) -> (Self, Sender<Transmission>) {
        let (mtx, mrx) = tokio::sync::mpsc::channel(100);

        info!("MQTT connection to {}:{} starting up", config.host, config.port);
        let mut mqttoptions = MqttOptions::new(config.client_name.clone(), config.host.clone(), config.port);
        mqttoptions.set_keep_alive(Duration::from_secs(5));
        mqttoptions.set_credentials(config.user.clone(), config.pass.clone());

        let (client, mut eventloop) = AsyncClient::new(mqttoptions, 10);

        // Spawn a new task to handle the incoming telegrams
        let reconnect_c = client.clone();
        tokio::spawn(async move {
            info!("MQTT Eventloop started");
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::Publish(p))) => {
                        debug!("Received {} bytes on {}", p.payload.len(), p.topic);
                        let callback = CALLBACKS.read().await;
                        callback.send(&p.topic, &p.payload).await;
                    },
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        info!("Connected, resubscribing everything");

                        /* We are connected resubscribe to everything */
                        let topics = CALLBACKS.read().await.get_topics();
                        for topic in topics {
                            let client_clone = reconnect_c.clone();
                            tokio::spawn(async move {
                                if let Err(e) = client_clone.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                                    error!("Resubscribing {topic} failed: {e}");
                                }
                            });
                        }
                    },
                    Ok(_) => {},
                    Err(e) => {
                        error!("Error in MQTT {:?}, reconnecting ", e);
                        tokio::time::sleep(Duration::from_secs(1)).await;
                    }
                }
            }
        });

        return (MqttManager {
            client,
            rx: mrx,
            exit_thread: false,
            topic_prefix: config.topic_prefix.clone(),
        }, mtx);
    }

    pub async fn start_thread(&mut self) {
        // Handle all the incoming metering stuff
        while !self.exit_thread {
            let Some(transmission) = self.rx.recv().await else {
                debug!("Reading returned none, we exit now");
                self.exit_thread = true;
                continue;
            };

            match transmission {
                Transmission::Metering(data) => self.publish_metering(data).await,
                Transmission::Subscribe(subscribe_data) => {
                    let topic = format!("{}/{}", self.topic_prefix, subscribe_data.topic);
                    match self.client.subscribe(topic.clone(), QoS::AtLeastOnce).await {
                        Ok(_) => {
                            CALLBACKS.write().await.insert(topic.clone(), subscribe_data.sender);
                            info!("Registered Callback {topic}");
                        }
                        Err(e) => error!("Subscribing {topic} failed: {e}"),
                    }
                },
                Transmission::Publish(publish_data) => {
                    match self.client.publish(
                        publish_data.topic,
                        qos_from_u8(publish_data.qos),
                        publish_data.retain,
                        publish_data.payload
                    ).await {
                        Err(e) => { error!("Error publishing: {}", e); },
                        Ok(_) => { debug!("Published successfully"); }
                    }
                },
            };
        }

        info!("Thread exit, waiting");
    }

    async fn publish_metering(&self, data: MeteringData) {
        info!("Metering data received: {}", data.id);

        match serde_json::to_string(&data) {
            Ok(payload) => {
                if let Err(e) = self.client.publish(format!("{}/raw", self.topic_prefix), QoS::AtLeastOnce, false, payload).await {
                    error!("Error sending: {}", e);
                }
            }
            Err(e) => error!("Unable to serialize metering data {}: {}", data.id, e),
        }

        match serde_json::to_string(&data.metered_values) {
            Ok(payload) => {
                let topic = device_topic(&self.topic_prefix, &data);
                if let Err(e) = self.client.publish(topic, QoS::AtLeastOnce, false, payload).await {
                    error!("Error sending: {}", e);
                }
            }
            Err(e) => error!("Unable to serialize values of {}: {}", data.meter_name, e),
        }
    }
}

pub fn device_topic(prefix: &str, data: &MeteringData) -> String {
    format!("{}/devs/{:?}/{}", prefix, data.protocol, data.meter_name)
}

// Each protocol module publishes its own counters

pub async fn publish_protocol_count(mqtt_sender: &Sender<Transmission>, prefix: &str, protocol: &str, count: u64) {
    publish_protocol_value(mqtt_sender, prefix, protocol, "count", count.to_string()).await;
}

pub async fn publish_protocol_value(mqtt_sender: &Sender<Transmission>, prefix: &str, protocol: &str, name: &str, payload: String) {
    let publish = PublishData {
        topic: format!("{}/mgt/{}/{}", prefix, protocol, name),
        payload,
        qos: 1,
        retain: true,
    };
    let _ = mqtt_sender.send(Transmission::Publish(publish)).await;
}
