pub mod config;
pub mod error;
pub mod logging;
pub mod publisher;
pub mod queue;
pub mod reading;

pub use config::Config;
pub use error::{ProducerError, Result};
pub use publisher::{MessageSink, PublishStats, TelemetryPublisher};
pub use queue::Broker;
pub use reading::Reading;
