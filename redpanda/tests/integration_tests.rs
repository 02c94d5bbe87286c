//! Integration tests for [`RedpandaEventBus`] with a real Kafka instance.
//!
//! These tests use testcontainers to spin up Kafka and validate:
//! - Records are keyed by account id
//! - Payloads decode back to the published event
//! - The `event_type` header is set
//! - Per-key ordering is preserved
//!
//! # Running These Tests
//!
//! These tests are marked as `#[ignore]` by default because they require Docker
//! and take 15-60 seconds to spin up Kafka.
//!
//! To run explicitly:
//! ```bash
//! cargo test -p accounts-redpanda --test integration_tests -- --ignored
//! ```

#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use accounts_core::{AccountEvent, AccountEventPayload, Event, EventBus, SerializedEvent, Timestamp};
use accounts_redpanda::{EVENT_TYPE_HEADER, RedpandaEventBus, decode_payload};
use rdkafka::ClientConfig;
use rdkafka::consumer::{Consumer, StreamConsumer};
use rdkafka::message::{Headers, Message};
use std::time::Duration;
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, ImageExt};
use testcontainers_modules::kafka::{KAFKA_PORT, Kafka};

/// A record read back from the topic.
struct Received {
    key: String,
    event_type_header: Option<String>,
    event: SerializedEvent,
}

fn account_event(account_id: &str, payload: AccountEventPayload) -> SerializedEvent {
    let event = AccountEvent::new(
        format!("evt-{account_id}"),
        Timestamp::from(chrono::Utc::now()),
        account_id.to_string(),
        payload,
    );
    SerializedEvent::from_event(&event).expect("serialize event")
}

async fn start_kafka() -> (ContainerAsync<Kafka>, String) {
    let kafka = Kafka::default()
        .with_env_var("KAFKA_AUTO_CREATE_TOPICS_ENABLE", "true")
        .start()
        .await
        .expect("Failed to start Kafka container");

    let host = kafka.get_host().await.expect("Failed to get host");
    let port = kafka
        .get_host_port_ipv4(KAFKA_PORT)
        .await
        .expect("Failed to get port");
    let brokers = format!("{host}:{port}");

    wait_for_kafka_ready(&brokers).await;
    (kafka, brokers)
}

/// Publish warmup records until the broker accepts them.
async fn wait_for_kafka_ready(brokers: &str) {
    let max_attempts = 60;
    let bus = RedpandaEventBus::new(brokers).expect("Failed to create event bus");
    let warmup = SerializedEvent::new("warmup".to_string(), vec![0]);

    for attempt in 1..=max_attempts {
        if bus.publish("warmup-topic", "warmup", &warmup).await.is_ok() {
            tokio::time::sleep(Duration::from_millis(500)).await;
            return;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(
            attempt != max_attempts,
            "Kafka failed to become ready after {max_attempts} attempts"
        );
    }
}

fn consumer(brokers: &str, topic: &str) -> StreamConsumer {
    let consumer: StreamConsumer = ClientConfig::new()
        .set("bootstrap.servers", brokers)
        .set("group.id", format!("test-{topic}"))
        .set("auto.offset.reset", "earliest")
        .set("enable.partition.eof", "false")
        .create()
        .expect("Failed to create consumer");
    consumer.subscribe(&[topic]).expect("Failed to subscribe");
    consumer
}

async fn receive(consumer: &StreamConsumer, count: usize) -> Vec<Received> {
    let mut received = Vec::new();
    tokio::time::timeout(Duration::from_secs(30), async {
        while received.len() < count {
            let message = consumer.recv().await.expect("Failed to receive");
            let key = message
                .key()
                .map(|k| String::from_utf8_lossy(k).into_owned())
                .unwrap_or_default();
            let event_type_header = message.headers().and_then(|headers| {
                headers
                    .iter()
                    .find(|h| h.key == EVENT_TYPE_HEADER)
                    .and_then(|h| h.value)
                    .map(|v| String::from_utf8_lossy(v).into_owned())
            });
            let event = decode_payload(message.payload().expect("payload")).expect("decode");
            received.push(Received {
                key,
                event_type_header,
                event,
            });
        }
    })
    .await
    .expect("Timeout waiting for records");
    received
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_publish_keys_record_by_account_id() {
    let (_kafka, brokers) = start_kafka().await;

    let bus = RedpandaEventBus::builder()
        .brokers(&brokers)
        .producer_acks("all")
        .build()
        .expect("Failed to create event bus");

    let event = account_event(
        "acct-1",
        AccountEventPayload::Created {
            name: "Acme".to_string(),
            description: String::new(),
        },
    );
    bus.publish("account-events-key", "acct-1", &event)
        .await
        .expect("publish");

    let consumer = consumer(&brokers, "account-events-key");
    let received = receive(&consumer, 1).await;

    assert_eq!(received[0].key, "acct-1");
    assert_eq!(received[0].event_type_header.as_deref(), Some("AccountCreated.v1"));
    assert_eq!(received[0].event, event);

    let decoded = AccountEvent::from_bytes(&received[0].event.data).expect("decode account event");
    assert_eq!(decoded.account_id, "acct-1");
}

#[tokio::test]
#[ignore = "requires Docker"]
async fn test_events_for_one_account_stay_ordered() {
    let (_kafka, brokers) = start_kafka().await;

    let bus = RedpandaEventBus::new(&brokers).expect("Failed to create event bus");

    let events = vec![
        account_event(
            "acct-7",
            AccountEventPayload::Created {
                name: "Acme".to_string(),
                description: String::new(),
            },
        ),
        account_event(
            "acct-7",
            AccountEventPayload::Inactivated {
                reason: "closing".to_string(),
            },
        ),
        account_event(
            "acct-7",
            AccountEventPayload::Reactivated {
                reason: "reopened".to_string(),
            },
        ),
    ];

    for event in &events {
        bus.publish("account-events-order", "acct-7", event)
            .await
            .expect("publish");
    }

    let consumer = consumer(&brokers, "account-events-order");
    let received = receive(&consumer, events.len()).await;

    let types: Vec<_> = received.iter().map(|r| r.event.event_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            "AccountCreated.v1",
            "AccountInactivated.v1",
            "AccountReactivated.v1"
        ]
    );
    assert!(received.iter().all(|r| r.key == "acct-7"));
}
