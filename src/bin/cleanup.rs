//! One-shot removal of every discovery registration this bridge can have
//! published, by retaining empty payloads on the config topics.

use aiseg2_bridge::cleanup;
use aiseg2_bridge::config::Config;
use aiseg2_bridge::discovery::DiscoveryPublisher;
use aiseg2_bridge::mqtt;
use aiseg2_bridge::registry::SensorRegistry;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();

    let cfg_path =
        std::env::var("APP_CONFIG").unwrap_or_else(|_| "config/config.example.yaml".into());
    let cfg = Config::load(&cfg_path)?;

    let identities = SensorRegistry::configured_identities(cfg.cleanup.circuit_max);
    info!(
        count = identities.len(),
        device = %cfg.device.id,
        "removing discovery registrations"
    );

    let bus = Arc::new(mqtt::MqttBus::connect(mqtt::build_options(&cfg.mqtt)));
    let publisher = DiscoveryPublisher::new(
        Arc::clone(&bus),
        cfg.mqtt.discovery_prefix.clone(),
        cfg.device.clone(),
    );

    let failures = cleanup::run(&publisher, &identities).await;
    if let Err(e) = bus.disconnect().await {
        warn!(error = %e, "mqtt disconnect failed");
    }

    anyhow::ensure!(failures == 0, "{failures} removal(s) failed");
    info!("cleanup complete");
    Ok(())
}
