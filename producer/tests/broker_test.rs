use std::time::Duration;

use sensor_producer::{Broker, Config, ProducerError};

#[tokio::test]
async fn unreachable_broker_fails_at_connect() {
    // Nothing listens on port 1, so the dial itself must fail.
    let config = Config {
        queue_host: "127.0.0.1".to_string(),
        queue_port: 1,
        ..Config::default()
    };

    let result = tokio::time::timeout(Duration::from_secs(30), Broker::connect(&config))
        .await
        .expect("connect should fail fast on a refused port");

    match result {
        Err(err @ ProducerError::Connect(_)) => assert!(err.is_fatal()),
        Err(other) => panic!("expected a connection error, got {}", other),
        Ok(_) => panic!("connected to a port with no broker"),
    }
}
