use dsmr2mqtt::{mqtt::MqttManager, DsmrManager, CONFIG};
use tokio::task::JoinHandle;
use std::time::Duration;
use log::info;


#[tokio::main]
async fn main() -> std::io::Result<()> {
    // Initialize logging
    let default_filter = std::env::var("D2M_LOG_LEVEL").unwrap_or("info".to_string());
    env_logger::init_from_env(env_logger::Env::new().default_filter_or(default_filter));

    // we need a channel for the subparts to send metering data to the handler
    let (mut mqtt, tx) = MqttManager::new();

    let mut threads: Vec<JoinHandle<()>> = Vec::new();

    threads.push(tokio::spawn(async move {
        mqtt.start_thread().await;
    }));

    let dsmr_enabled = {
        let config = CONFIG.read().unwrap_or_else(std::sync::PoisonError::into_inner);
        config.config.dsmr.enabled
    };

    // Start DSMR if needed
    if dsmr_enabled {
        let mut dsmr = DsmrManager::new(tx.clone());
        threads.push(tokio::spawn(async move {
            dsmr.start_thread().await;
        }));
    } else {
        info!("DSMR input disabled, only the MQTT connection is running");
    }

    info!("All modules started, now waiting for a signal to exit");
    loop {
        tokio::time::sleep(Duration::from_secs(10)).await;
        let kill_all_tasks = threads.iter().any(|task| task.is_finished());

        if kill_all_tasks {
            for task in threads.iter_mut() {
                task.abort();
            }
            break;
        }
    }
    Ok(())
}
