use crate::config::MqttConfig;
use crate::discovery::MessageBus;
use crate::error::AppError;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::watch;
use tracing::warn;
use uuid::Uuid;

// Use the MQTT v5 API surface only
use rumqttc::v5 as mqtt5;
use rumqttc::Transport;

pub type MqttOptions = mqtt5::MqttOptions;
pub type AsyncClient = mqtt5::AsyncClient;

/// Upper bound on a single publish, including the wait for a live connection.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(5);
/// How long `disconnect` waits for a connection before giving up on draining
/// queued messages.
const FLUSH_TIMEOUT: Duration = Duration::from_secs(5);

pub fn build_options(cfg: &MqttConfig) -> MqttOptions {
    let client_id = format!("aiseg2-bridge-{}", Uuid::new_v4());
    // Using v5::MqttOptions selects MQTT 5
    let mut opts = MqttOptions::new(client_id, &cfg.host, cfg.port);
    opts.set_keep_alive(Duration::from_secs(cfg.keep_alive_secs.unwrap_or(30)));
    opts.set_clean_start(cfg.clean_session.unwrap_or(true));
    if let (Some(u), Some(p)) = (&cfg.username, &cfg.password) {
        opts.set_credentials(u.clone(), p.clone());
    }
    if cfg.port == 8883 {
        opts.set_transport(Transport::tls_with_default_config());
    }
    opts
}

/// Single persistent connection, reused across poll cycles. The spawned
/// driver keeps the event loop turning and rides out transient disconnects;
/// it also tracks connection health so a publish against an unreachable
/// broker fails with `AppError::Publish` instead of queueing forever.
pub struct MqttBus {
    client: AsyncClient,
    health: watch::Receiver<bool>,
}

impl MqttBus {
    pub fn connect(options: MqttOptions) -> Self {
        let (client, mut eventloop) = mqtt5::AsyncClient::new(options, 50);
        let (health_tx, health) = watch::channel(false);
        tokio::spawn(async move {
            loop {
                match eventloop.poll().await {
                    Ok(mqtt5::Event::Incoming(mqtt5::Incoming::ConnAck(_))) => {
                        let _ = health_tx.send(true);
                    }
                    Ok(_) => {}
                    Err(e) => {
                        let _ = health_tx.send(false);
                        warn!("mqtt error: {e}; reconnecting after short delay");
                        tokio::time::sleep(Duration::from_secs(2)).await;
                    }
                }
            }
        });
        Self { client, health }
    }

    /// Resolves once the event loop has a live connection. Returns
    /// immediately if the driver task is gone (runtime shutting down).
    async fn await_connected(&self) {
        let mut health = self.health.clone();
        loop {
            if *health.borrow_and_update() {
                return;
            }
            if health.changed().await.is_err() {
                return;
            }
        }
    }

    /// Flush and close the connection; used by the one-shot cleanup binary.
    /// rumqttc 0.24 has no per-publish ack notification, so draining is a
    /// grace period taken after the connection is known to be up.
    pub async fn disconnect(&self) -> Result<(), AppError> {
        tokio::time::timeout(FLUSH_TIMEOUT, self.await_connected())
            .await
            .map_err(|_| {
                AppError::Publish("no broker connection to flush queued messages".into())
            })?;
        tokio::time::sleep(Duration::from_millis(500)).await;
        self.client
            .disconnect()
            .await
            .map_err(|e| AppError::Publish(e.to_string()))
    }
}

#[async_trait]
impl MessageBus for MqttBus {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> Result<(), AppError> {
        let send = async {
            self.await_connected().await;
            self.client
                .publish(topic, mqtt5::mqttbytes::QoS::AtLeastOnce, retain, payload)
                .await
                .map_err(|e| AppError::Publish(e.to_string()))
        };
        tokio::time::timeout(PUBLISH_TIMEOUT, send)
            .await
            .map_err(|_| {
                AppError::Publish(format!("publish to {topic} timed out waiting for broker"))
            })?
    }
}
