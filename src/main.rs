use aiseg2_bridge::config::Config;
use aiseg2_bridge::discovery::DiscoveryPublisher;
use aiseg2_bridge::fetch::AisegClient;
use aiseg2_bridge::mqtt;
use aiseg2_bridge::poll::PollLoop;
use aiseg2_bridge::registry::SensorRegistry;
use tracing::info;
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
    info!(
        monitor = %cfg.aiseg.host,
        device = %cfg.device.id,
        interval_secs = cfg.poll.interval_secs,
        "loaded config"
    );

    let fetcher = AisegClient::new(&cfg.aiseg)?;
    let bus = mqtt::MqttBus::connect(mqtt::build_options(&cfg.mqtt));
    info!(host = %cfg.mqtt.host, port = cfg.mqtt.port, "mqtt client started");

    let registry = SensorRegistry::new(&cfg.device.id);
    let publisher =
        DiscoveryPublisher::new(bus, cfg.mqtt.discovery_prefix.clone(), cfg.device.clone());
    PollLoop::new(fetcher, registry, publisher, &cfg.poll)
        .run()
        .await?;

    Ok(())
}
