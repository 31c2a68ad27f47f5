use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProducerError {
    #[error("Invalid value for {key}: {value:?} ({reason})")]
    Config {
        key: &'static str,
        value: String,
        reason: String,
    },

    #[error("Failed to connect to RabbitMQ: {0}")]
    Connect(#[source] lapin::Error),

    #[error("Failed to open a channel: {0}")]
    Channel(#[source] lapin::Error),

    #[error("Failed to declare queue '{queue}': {source}")]
    QueueDeclare {
        queue: String,
        #[source]
        source: lapin::Error,
    },

    #[error("Failed to enable publisher confirms: {0}")]
    ConfirmSelect(#[source] lapin::Error),

    #[error("Failed to serialize reading: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to publish message: {0}")]
    Publish(#[source] lapin::Error),

    #[error("Broker rejected message on queue '{queue}'")]
    Nacked { queue: String },

    #[error("Failed to close broker connection: {0}")]
    Close(#[source] lapin::Error),
}

impl ProducerError {
    /// Startup errors stop the process; everything else only costs one reading.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ProducerError::Config { .. }
                | ProducerError::Connect(_)
                | ProducerError::Channel(_)
                | ProducerError::QueueDeclare { .. }
                | ProducerError::ConfirmSelect(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, ProducerError>;
