// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Integration tests for the MQTT transport using mockforge-mqtt.

use std::time::Duration;

use mockforge_mqtt::broker::MqttConfig;
use mockforge_mqtt::start_mqtt_server;
use rs90_lib::protocol::{MqttBroker, QoS, Transport};
use rs90_lib::{Remote, RemoteConfig};
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};

/// Helper to find an available port for testing.
fn get_test_port() -> u16 {
    use std::sync::atomic::{AtomicU16, Ordering};
    static PORT_COUNTER: AtomicU16 = AtomicU16::new(18950);
    PORT_COUNTER.fetch_add(1, Ordering::SeqCst)
}

/// Starts a mock MQTT broker on the given port.
async fn start_mock_broker(port: u16) {
    let config = MqttConfig {
        port,
        host: "127.0.0.1".to_string(),
        ..Default::default()
    };

    tokio::spawn(async move {
        let _ = start_mqtt_server(config).await;
    });

    // Give the broker time to start, bind to port, and be ready to accept connections
    sleep(Duration::from_millis(500)).await;
}

async fn connect(port: u16) -> MqttBroker {
    MqttBroker::builder()
        .host("127.0.0.1")
        .port(port)
        .connection_timeout(Duration::from_secs(5))
        .build()
        .await
        .expect("connect to mock broker")
}

// ============================================================================
// MqttBroker Connection Tests
// ============================================================================

mod broker_connection {
    use super::*;

    #[tokio::test]
    async fn connect_to_broker() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = connect(port).await;

        assert!(broker.is_connected());
        assert_eq!(broker.host(), "127.0.0.1");
        assert_eq!(broker.port(), port);
        assert!(broker.client_id().starts_with("rs90_"));
        assert!(!broker.has_credentials());

        broker.disconnect().await.unwrap();
        assert!(!broker.is_connected());
    }

    #[tokio::test]
    async fn connect_with_client_id() {
        let port = get_test_port();
        start_mock_broker(port).await;

        let broker = MqttBroker::builder()
            .host("127.0.0.1")
            .port(port)
            .client_id("living_room_bridge")
            .build()
            .await
            .unwrap();

        assert_eq!(broker.client_id(), "living_room_bridge");
    }

    #[tokio::test]
    async fn subscription_is_released_with_handle() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;

        let (tx, _rx) = mpsc::channel(8);
        let first = broker
            .subscribe("Haptique/r1/status", QoS::AtMostOnce, tx.clone())
            .await
            .unwrap();
        let second = broker
            .subscribe("Haptique/r1/status", QoS::AtMostOnce, tx)
            .await
            .unwrap();
        assert_eq!(broker.subscription_count(), 1);

        first.cancel();
        assert_eq!(broker.subscription_count(), 1);
        drop(second);
        assert_eq!(broker.subscription_count(), 0);
    }

    #[tokio::test]
    async fn publish_is_routed_back_to_subscriber() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;

        let (tx, mut rx) = mpsc::channel(8);
        let _handle = broker
            .subscribe("Haptique/r1/keys", QoS::AtMostOnce, tx)
            .await
            .unwrap();
        sleep(Duration::from_millis(200)).await;

        broker
            .publish("Haptique/r1/keys", "button:5", QoS::AtLeastOnce, false)
            .await
            .unwrap();

        let message = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("message within timeout")
            .expect("sink open");
        assert_eq!(message.topic, "Haptique/r1/keys");
        assert_eq!(message.payload, "button:5");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn topic_stays_live_when_released_while_resubscribing() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;
        let topic = "Haptique/r1/device/TV/commands";

        let (tx, mut rx) = mpsc::channel(8);
        let mut live = None;
        for _ in 0..20 {
            drop(live.take());
            let stale = broker
                .subscribe(topic, QoS::AtMostOnce, tx.clone())
                .await
                .unwrap();
            let release = tokio::task::spawn_blocking(move || drop(stale));
            let fresh = broker
                .subscribe(topic, QoS::AtMostOnce, tx.clone())
                .await
                .unwrap();
            release.await.unwrap();
            live = Some(fresh);
        }
        assert_eq!(broker.subscription_count(), 1);
        sleep(Duration::from_millis(300)).await;

        broker
            .publish(topic, r#"["POWER"]"#, QoS::AtLeastOnce, false)
            .await
            .unwrap();

        let message = timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("topic still subscribed at the broker")
            .expect("sink open");
        assert_eq!(message.topic, topic);
        drop(live);
    }
}

// ============================================================================
// Remote over MQTT
// ============================================================================

mod remote_mqtt {
    use super::*;

    #[tokio::test]
    async fn remote_start_and_shutdown() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;

        let remote = Remote::start(broker.clone(), RemoteConfig::new("r1"))
            .await
            .unwrap();
        assert_eq!(broker.subscription_count(), 6);

        let diagnostics = remote.diagnostics().await.unwrap();
        assert_eq!(diagnostics.base_topic, "Haptique/r1");
        assert_eq!(diagnostics.subscriptions.global, 6);

        remote.shutdown().await.unwrap();
        assert_eq!(broker.subscription_count(), 0);
        assert!(!remote.is_running());
    }

    #[tokio::test]
    async fn two_remotes_share_one_connection() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;

        let living_room = Remote::start(broker.clone(), RemoteConfig::new("r1"))
            .await
            .unwrap();
        let bedroom = Remote::start(broker.clone(), RemoteConfig::new("r2"))
            .await
            .unwrap();
        assert_eq!(broker.subscription_count(), 12);

        living_room.shutdown().await.unwrap();
        assert_eq!(broker.subscription_count(), 6);
        assert!(bedroom.is_running());

        bedroom.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn remote_reports_publish_failure_after_disconnect() {
        let port = get_test_port();
        start_mock_broker(port).await;
        let broker = connect(port).await;

        let remote = Remote::start(broker.clone(), RemoteConfig::new("r1"))
            .await
            .unwrap();
        broker.disconnect().await.unwrap();
        sleep(Duration::from_millis(200)).await;

        // The request queue of the closed client may still accept a few
        // messages; what matters is that the engine keeps running.
        let _ = remote.trigger_device_command("TV", "POWER").await;
        assert!(remote.is_running());

        remote.shutdown().await.unwrap();
    }
}

// ============================================================================
// Builder Error Tests
// ============================================================================

mod builder_errors {
    use super::*;
    use rs90_lib::ProtocolError;

    #[tokio::test]
    async fn build_missing_host_fails() {
        let result = MqttBroker::builder().port(1883).build().await;
        assert!(matches!(result, Err(ProtocolError::InvalidAddress(_))));
    }

    #[tokio::test]
    async fn build_unreachable_broker_fails() {
        let result = MqttBroker::builder()
            .host("127.0.0.1")
            .port(1)
            .connection_timeout(Duration::from_secs(2))
            .build()
            .await;
        assert!(matches!(result, Err(ProtocolError::ConnectionFailed(_))));
    }
}
