use async_trait::async_trait;
use lapin::options::{BasicPublishOptions, ConfirmSelectOptions, QueueDeclareOptions};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties};
use log::{info, warn};

use crate::config::Config;
use crate::error::{ProducerError, Result};
use crate::publisher::MessageSink;

pub const CONTENT_TYPE_JSON: &str = "application/json";
/// AMQP delivery mode asking the broker to write the message to disk.
pub const DELIVERY_MODE_PERSISTENT: u8 = 2;

const REPLY_SUCCESS: u16 = 200;

/// The producer's single connection and channel, bound to one declared queue.
pub struct Broker {
    connection: Connection,
    channel: Channel,
    queue_name: String,
    confirms: bool,
}

impl Broker {
    /// Dials the broker, opens a channel and declares the queue. Each step
    /// only runs if the previous one succeeded.
    pub async fn connect(config: &Config) -> Result<Broker> {
        info!("Connecting to RabbitMQ at {}...", config.redacted_uri());
        let connection = Connection::connect(&config.amqp_uri(), ConnectionProperties::default())
            .await
            .map_err(ProducerError::Connect)?;
        info!("Connection to RabbitMQ established");

        let channel = connection
            .create_channel()
            .await
            .map_err(ProducerError::Channel)?;
        info!("Channel opened");

        let queue = channel
            .queue_declare(&config.queue_name, queue_options(), FieldTable::default())
            .await
            .map_err(|source| ProducerError::QueueDeclare {
                queue: config.queue_name.clone(),
                source,
            })?;
        info!(
            "Queue ready: {} ({} messages waiting)",
            queue.name(),
            queue.message_count()
        );

        if config.publisher_confirms {
            channel
                .confirm_select(ConfirmSelectOptions::default())
                .await
                .map_err(ProducerError::ConfirmSelect)?;
            info!("Publisher confirms enabled");
        }

        Ok(Broker {
            connection,
            channel,
            queue_name: config.queue_name.clone(),
            confirms: config.publisher_confirms,
        })
    }

    /// Publishes one body to the default exchange, routed to our queue.
    pub async fn publish_payload(&self, payload: &[u8]) -> Result<()> {
        let confirm = self
            .channel
            .basic_publish(
                "",
                &self.queue_name,
                BasicPublishOptions::default(),
                payload,
                message_properties(),
            )
            .await
            .map_err(ProducerError::Publish)?;

        if self.confirms {
            let confirmation = confirm.await.map_err(ProducerError::Publish)?;
            if confirmation.is_nack() {
                return Err(ProducerError::Nacked {
                    queue: self.queue_name.clone(),
                });
            }
        }

        Ok(())
    }

    /// Closes the channel, then the connection. The connection close is
    /// attempted even when the channel close fails; the first error wins.
    pub async fn close(self) -> Result<()> {
        let channel_closed = self
            .channel
            .close(REPLY_SUCCESS, "Producer shutting down")
            .await;
        let connection_closed = self
            .connection
            .close(REPLY_SUCCESS, "Producer shutting down")
            .await;
        if let (Err(_), Err(e)) = (&channel_closed, &connection_closed) {
            warn!("Failed to close connection: {}", e);
        }

        first_close_error(channel_closed, connection_closed)?;
        info!("Connection to RabbitMQ closed");
        Ok(())
    }
}

#[async_trait]
impl MessageSink for Broker {
    async fn publish(&mut self, payload: &[u8]) -> Result<()> {
        self.publish_payload(payload).await
    }
}

fn first_close_error(channel: lapin::Result<()>, connection: lapin::Result<()>) -> Result<()> {
    channel.and(connection).map_err(ProducerError::Close)
}

/// Durable, shared, never auto-deleted.
pub fn queue_options() -> QueueDeclareOptions {
    QueueDeclareOptions {
        durable: true,
        auto_delete: false,
        exclusive: false,
        ..QueueDeclareOptions::default()
    }
}

pub fn message_properties() -> BasicProperties {
    BasicProperties::default()
        .with_content_type(CONTENT_TYPE_JSON.into())
        .with_delivery_mode(DELIVERY_MODE_PERSISTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn queue_survives_restart_and_is_shared() {
        let options = queue_options();
        assert!(options.durable);
        assert!(!options.auto_delete);
        assert!(!options.exclusive);
        assert!(!options.passive);
        assert!(!options.nowait);
    }

    #[test]
    fn messages_are_persistent_json() {
        let properties = message_properties();
        assert_eq!(
            properties.content_type().as_ref().map(|ct| ct.as_str()),
            Some("application/json")
        );
        assert_eq!(*properties.delivery_mode(), Some(2));
    }

    #[test]
    fn close_reports_the_channel_error_first() {
        let channel = Err(lapin::Error::InvalidChannel(1));
        let connection = Err(lapin::Error::InvalidChannel(0));
        match first_close_error(channel, connection) {
            Err(ProducerError::Close(lapin::Error::InvalidChannel(id))) => assert_eq!(id, 1),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn close_reports_a_connection_error_after_a_clean_channel_close() {
        let connection = Err(lapin::Error::InvalidChannel(0));
        assert!(matches!(
            first_close_error(Ok(()), connection),
            Err(ProducerError::Close(_))
        ));
        assert!(first_close_error(Ok(()), Ok(())).is_ok());
    }

    #[test]
    fn publishes_are_not_mandatory() {
        let options = BasicPublishOptions::default();
        assert!(!options.mandatory);
        assert!(!options.immediate);
    }
}
