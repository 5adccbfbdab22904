//! Dialer and connection lifecycle tests

use std::sync::Arc;

use relay_broker::{Channel, Connection, Dialer, FieldTable, QueueDeclareOptions};
use relay_harness::{SimConnection, SimDialer};

fn tls_config() -> Arc<rustls::ClientConfig> {
    let config =
        rustls::ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
            .with_safe_default_protocol_versions()
            .expect("ring supports the default protocol versions")
            .with_root_certificates(rustls::RootCertStore::empty())
            .with_no_client_auth();
    Arc::new(config)
}

#[tokio::test]
async fn dial_and_dial_tls_share_one_channel() {
    let dialer = SimDialer::new("amqp://broker:5672/");

    let plain = dialer.dial("amqp://broker:5672/").await.expect("dial never fails");
    let secure = dialer.dial_tls("amqps://broker:5671/", tls_config()).await.expect("dial never fails");

    assert!(Arc::ptr_eq(&plain, &secure));

    let from_plain = plain.channel().await.expect("channel never fails");
    let from_secure = secure.channel().await.expect("channel never fails");
    assert!(Arc::ptr_eq(&from_plain, &from_secure));
}

#[tokio::test]
async fn dial_ignores_address() {
    let dialer = SimDialer::new("amqp://configured/");

    let connection = dialer.dial("amqp://somewhere-else/").await.expect("dial never fails");

    assert_eq!(connection.url(), "amqp://configured/");
}

#[tokio::test]
async fn repeated_channel_requests_return_same_instance() {
    let connection = SimConnection::new("amqp://localhost/");

    let first = connection.channel().await.expect("channel never fails");
    first
        .queue_declare("events", QueueDeclareOptions::default(), FieldTable::new())
        .await
        .expect("declare never fails");
    let second = connection.channel().await.expect("channel never fails");

    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(second.queue_count(), 1);
}

#[tokio::test]
async fn dialers_sharing_a_connection_share_topology() {
    let connection = Arc::new(SimConnection::default());
    let producer_side = SimDialer::with_connection(Arc::clone(&connection));
    let consumer_side = SimDialer::with_connection(connection);

    let producer = producer_side.dial("a").await.expect("dial never fails");
    let consumer = consumer_side.dial("b").await.expect("dial never fails");

    producer
        .channel()
        .await
        .expect("channel never fails")
        .queue_declare("events", QueueDeclareOptions::default(), FieldTable::new())
        .await
        .expect("declare never fails");

    assert_eq!(consumer.channel().await.expect("channel never fails").queue_count(), 1);
}

#[tokio::test]
async fn close_always_succeeds() {
    let connection = SimConnection::default();

    assert!(connection.close().await.is_ok());
    assert!(connection.close().await.is_ok());
}
