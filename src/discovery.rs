//! Home Assistant MQTT Discovery: retained config messages, state messages
//! and retained-empty removals.

use crate::config::DeviceConfig;
use crate::error::AppError;
use crate::registry::SensorDefinition;
use async_trait::async_trait;
use serde::Serialize;

/// Narrow seam to the message bus; the rumqttc client implements this in
/// production and tests substitute a recording fake.
#[async_trait]
pub trait MessageBus: Send + Sync {
    async fn publish(&self, topic: &str, payload: Vec<u8>, retain: bool)
        -> Result<(), AppError>;
}

#[async_trait]
impl<B: MessageBus> MessageBus for std::sync::Arc<B> {
    async fn publish(
        &self,
        topic: &str,
        payload: Vec<u8>,
        retain: bool,
    ) -> Result<(), AppError> {
        (**self).publish(topic, payload, retain).await
    }
}

#[derive(Serialize)]
struct DeviceBlock<'a> {
    identifiers: [&'a str; 1],
    name: &'a str,
    manufacturer: &'a str,
    model: &'a str,
    sw_version: &'static str,
}

#[derive(Serialize)]
struct DiscoveryPayload<'a> {
    name: &'a str,
    object_id: &'a str,
    unique_id: &'a str,
    state_topic: String,
    unit_of_measurement: &'a str,
    device_class: &'a str,
    state_class: &'static str,
    last_reset: &'a str,
    device: DeviceBlock<'a>,
}

pub struct DiscoveryPublisher<B> {
    bus: B,
    discovery_prefix: String,
    device: DeviceConfig,
    // daily-reset totals: state_class "total" with last_reset at local
    // midnight, fixed at construction so re-announcing is byte-identical
    last_reset: String,
}

impl<B: MessageBus> DiscoveryPublisher<B> {
    pub fn new(bus: B, discovery_prefix: String, device: DeviceConfig) -> Self {
        Self {
            bus,
            discovery_prefix,
            device,
            last_reset: today_reset(),
        }
    }

    pub fn config_topic(&self, identity: &str) -> String {
        format!(
            "{}/sensor/{}/{}/config",
            self.discovery_prefix, self.device.id, identity
        )
    }

    pub fn state_topic(&self, identity: &str) -> String {
        format!("{}/{}/state", self.device.id, identity)
    }

    /// Publish the retained registration message for a sensor. Idempotent:
    /// the broker overwrites the retained message with an identical payload.
    pub async fn announce(&self, sensor: &SensorDefinition) -> Result<(), AppError> {
        let payload = DiscoveryPayload {
            name: &sensor.display_name,
            object_id: &sensor.unique_id,
            unique_id: &sensor.unique_id,
            state_topic: self.state_topic(&sensor.identity),
            unit_of_measurement: sensor.unit,
            device_class: sensor.device_class,
            state_class: "total",
            last_reset: &self.last_reset,
            device: DeviceBlock {
                identifiers: [&self.device.id],
                name: &self.device.name,
                manufacturer: &self.device.manufacturer,
                model: &self.device.model,
                sw_version: env!("CARGO_PKG_VERSION"),
            },
        };
        let bytes = serde_json::to_vec(&payload)
            .map_err(|e| AppError::Publish(format!("encode discovery payload: {e}")))?;
        self.bus
            .publish(&self.config_topic(&sensor.identity), bytes, true)
            .await
    }

    /// Publish the current value as a plain numeric string. Not retained:
    /// values are refreshed every poll cycle.
    pub async fn publish_state(&self, identity: &str, value: f64) -> Result<(), AppError> {
        self.bus
            .publish(&self.state_topic(identity), value.to_string().into_bytes(), false)
            .await
    }

    /// Delete a retained registration by publishing an empty retained payload
    /// to its config topic.
    pub async fn remove(&self, identity: &str) -> Result<(), AppError> {
        self.bus
            .publish(&self.config_topic(identity), Vec::new(), true)
            .await
    }
}

fn today_reset() -> String {
    let now = chrono::Local::now();
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|t| t.and_local_timezone(chrono::Local).earliest())
        .unwrap_or(now)
        .to_rfc3339()
}
