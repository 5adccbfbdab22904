//! SimChannel routing tests
//!
//! Every publish here runs with a reader attached to each queue the message
//! should reach, since deliveries have zero capacity.

use std::{sync::Arc, time::Duration};

use bytes::Bytes;
use relay_broker::{
    BasicCancelOptions, BasicConsumeOptions, BasicPublishOptions, BrokerError, Channel, Delivery,
    DeliveryStream, FieldTable, Publishing, QueueBindOptions, QueueDeclareOptions, QueueInfo,
};
use relay_harness::SimChannel;

async fn declare(channel: &SimChannel, name: &str) -> QueueInfo {
    channel
        .queue_declare(name, QueueDeclareOptions::default(), FieldTable::new())
        .await
        .expect("declare never fails")
}

async fn bind(channel: &SimChannel, queue: &str, key: &str, exchange: &str) {
    channel
        .queue_bind(queue, key, exchange, QueueBindOptions::default(), FieldTable::new())
        .await
        .expect("bind never fails");
}

async fn consume(channel: &SimChannel, queue: &str) -> Result<DeliveryStream, BrokerError> {
    channel.basic_consume(queue, "test-consumer", BasicConsumeOptions::default(), FieldTable::new()).await
}

async fn publish(channel: &SimChannel, exchange: &str, key: &str, body: &'static [u8]) {
    let message = Publishing::new(Bytes::from_static(body)).with_content_type("application/json");
    channel
        .basic_publish(exchange, key, BasicPublishOptions::default(), message)
        .await
        .expect("publish never fails");
}

/// Publish while reading once from `stream`, returning what it received.
async fn publish_and_read(
    channel: &SimChannel,
    stream: &DeliveryStream,
    exchange: &str,
    key: &str,
) -> Delivery {
    let (received, ()) = tokio::join!(stream.recv(), publish(channel, exchange, key, b"{}"));
    received.expect("stream open")
}

#[tokio::test]
async fn declare_returns_empty_descriptor() {
    let channel = SimChannel::new();

    let info = declare(&channel, "events").await;

    assert_eq!(info, QueueInfo { name: "events".to_string(), messages: 0, consumers: 0 });
}

#[tokio::test]
async fn declaring_same_name_creates_distinct_queues() {
    let channel = SimChannel::new();

    for _ in 0..3 {
        declare(&channel, "events").await;
    }

    assert_eq!(channel.queue_count(), 3);
    assert!(channel.queues().iter().all(|q| q.name() == "events"));
}

#[tokio::test]
async fn bind_before_declare_stores_nothing() {
    let channel = SimChannel::new();

    bind(&channel, "events", "key", "ingress").await;
    declare(&channel, "events").await;

    let queues = channel.queues();
    assert!(queues[0].bound_exchanges().is_empty());
}

#[tokio::test]
async fn bind_reaches_every_queue_with_name() {
    let channel = SimChannel::new();
    declare(&channel, "events").await;
    declare(&channel, "events").await;

    bind(&channel, "events", "key", "ingress").await;

    assert!(channel.queues().iter().all(|q| q.is_bound_to("ingress")));
}

#[tokio::test]
async fn publish_ignores_bound_routing_key() {
    let channel = SimChannel::new();
    declare(&channel, "q").await;
    bind(&channel, "q", "events", "ingress").await;
    let stream = consume(&channel, "q").await.expect("declared");

    let delivery = publish_and_read(&channel, &stream, "ingress", "other").await;

    assert_eq!(delivery.exchange(), "ingress");
    assert_eq!(delivery.routing_key(), "other");
    assert_eq!(delivery.body(), &Bytes::from_static(b"{}"));
    assert_eq!(delivery.content_type(), "application/json");
}

#[tokio::test]
async fn publish_skips_queues_bound_elsewhere() {
    let channel = SimChannel::new();
    declare(&channel, "bound").await;
    declare(&channel, "unbound").await;
    declare(&channel, "elsewhere").await;
    bind(&channel, "bound", "k", "ingress").await;
    bind(&channel, "elsewhere", "k", "egress").await;

    let bound = consume(&channel, "bound").await.expect("declared");
    let unbound = consume(&channel, "unbound").await.expect("declared");
    let elsewhere = consume(&channel, "elsewhere").await.expect("declared");

    publish_and_read(&channel, &bound, "ingress", "k").await;

    assert_eq!(unbound.try_recv(), None);
    assert_eq!(elsewhere.try_recv(), None);
}

#[tokio::test]
async fn publish_to_unbound_exchange_completes_immediately() {
    let channel = SimChannel::new();
    declare(&channel, "q").await;

    publish(&channel, "nobody-listens", "k", b"x").await;
}

#[tokio::test]
async fn publish_fans_out_to_every_bound_queue() {
    let channel = SimChannel::new();
    for name in ["a", "b", "c"] {
        declare(&channel, name).await;
        bind(&channel, name, name, "ingress").await;
    }

    let streams: Vec<DeliveryStream> = channel.queues().iter().map(|q| q.deliveries()).collect();
    let readers: Vec<_> = streams
        .into_iter()
        .map(|stream| tokio::spawn(async move { stream.recv().await }))
        .collect();

    publish(&channel, "ingress", "any", b"fan").await;

    for reader in readers {
        let delivery = reader.await.expect("reader task").expect("stream open");
        assert_eq!(delivery.body(), &Bytes::from_static(b"fan"));
    }
}

#[tokio::test]
async fn consume_undeclared_queue_is_not_found() {
    let channel = SimChannel::new();

    let result = consume(&channel, "missing").await;

    assert!(matches!(result, Err(BrokerError::QueueNotFound { ref queue }) if queue == "missing"));
}

#[tokio::test]
async fn consume_returns_first_declared_stream() {
    let channel = SimChannel::new();
    declare(&channel, "events").await;
    declare(&channel, "events").await;
    bind(&channel, "events", "k", "ingress").await;
    let stream = consume(&channel, "events").await.expect("declared");

    let reader = tokio::spawn(async move { stream.recv().await });

    // The first duplicate is offered the message first. Only the consumed
    // stream is read, so the publish reaches the first queue and then stalls
    // on the second.
    let result = channel
        .publish_timeout(
            "ingress",
            "k",
            BasicPublishOptions::default(),
            Publishing::new(Bytes::from_static(b"x")),
            Duration::from_millis(50),
        )
        .await;
    assert!(matches!(result, Err(BrokerError::PublishTimeout { .. })));

    let delivery = tokio::time::timeout(Duration::from_millis(50), reader)
        .await
        .expect("consumed stream belongs to the first declared queue")
        .expect("reader task")
        .expect("stream open");
    assert_eq!(delivery.body(), &Bytes::from_static(b"x"));
}

#[tokio::test]
async fn deliveries_arrive_in_publish_order() {
    let channel = Arc::new(SimChannel::new());
    declare(&channel, "q").await;
    bind(&channel, "q", "k", "ingress").await;
    let stream = consume(&channel, "q").await.expect("declared");

    let publisher = {
        let channel = Arc::clone(&channel);
        tokio::spawn(async move {
            for i in 0u8..5 {
                let message = Publishing::new(vec![i]);
                channel
                    .basic_publish("ingress", "k", BasicPublishOptions::default(), message)
                    .await
                    .expect("publish never fails");
            }
        })
    };

    for i in 0u8..5 {
        let delivery = stream.recv().await.expect("stream open");
        assert_eq!(&delivery.body()[..], &[i]);
    }

    publisher.await.expect("publisher task");
}

#[tokio::test]
async fn cancel_always_succeeds() {
    let channel = SimChannel::new();

    let result = channel.basic_cancel("never-registered", BasicCancelOptions { no_wait: true }).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn compatibility_flags_are_ignored() {
    let channel = SimChannel::new();
    let mut arguments = FieldTable::new();
    arguments.insert("x-message-ttl".to_string(), relay_broker::FieldValue::Int(-1));

    let info = channel
        .queue_declare(
            "q",
            QueueDeclareOptions { durable: true, auto_delete: true, exclusive: true, no_wait: true },
            arguments.clone(),
        )
        .await
        .expect("declare never fails");
    channel
        .queue_bind("q", "k", "ingress", QueueBindOptions { no_wait: true }, arguments.clone())
        .await
        .expect("bind never fails");
    let stream = channel
        .basic_consume(
            "q",
            "",
            BasicConsumeOptions { no_ack: true, exclusive: true, no_local: true, no_wait: true },
            arguments,
        )
        .await
        .expect("declared");

    assert_eq!(info.name, "q");
    let (received, result) = tokio::join!(
        stream.recv(),
        channel.basic_publish(
            "ingress",
            "k",
            BasicPublishOptions { mandatory: true, immediate: true },
            Publishing::new(Bytes::from_static(b"x")),
        )
    );
    assert!(received.is_some());
    assert!(result.is_ok());
}
