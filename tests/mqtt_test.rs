//! The production bus adapter against an unreachable broker: publishes must
//! surface `AppError::Publish` within a bounded time instead of silently
//! queueing, so the poll loop's error streak and the cleanup exit code see
//! broker outages.

use aiseg2_bridge::config::MqttConfig;
use aiseg2_bridge::discovery::MessageBus;
use aiseg2_bridge::mqtt::{build_options, MqttBus};
use std::time::{Duration, Instant};

fn unreachable_broker() -> MqttConfig {
    MqttConfig {
        host: "127.0.0.1".into(),
        // reserved port, nothing listens here
        port: 1,
        username: None,
        password: None,
        keep_alive_secs: Some(5),
        clean_session: Some(true),
        discovery_prefix: "homeassistant".into(),
    }
}

#[tokio::test]
async fn publish_fails_when_broker_unreachable() {
    let bus = MqttBus::connect(build_options(&unreachable_broker()));

    let started = Instant::now();
    let err = bus
        .publish("aiseg2-test/total_use_kwh/state", b"12.5".to_vec(), false)
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "publish");
    // bounded, not an indefinite queue-backpressure await
    assert!(started.elapsed() < Duration::from_secs(30));
}

#[tokio::test]
async fn disconnect_fails_when_broker_never_connected() {
    let bus = MqttBus::connect(build_options(&unreachable_broker()));
    let err = bus.disconnect().await.unwrap_err();
    assert_eq!(err.kind(), "publish");
}
