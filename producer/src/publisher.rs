use std::time::Duration;

use async_trait::async_trait;
use log::{error, info};
use rand::Rng;
use tokio::sync::watch;

use crate::config::Config;
use crate::error::{ProducerError, Result};
use crate::reading::Reading;

/// Somewhere to hand encoded readings to.
#[async_trait]
pub trait MessageSink {
    async fn publish(&mut self, payload: &[u8]) -> Result<()>;
}

pub type Encoder = Box<dyn FnMut(&Reading) -> serde_json::Result<Vec<u8>> + Send>;

/// Counters for one `run`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PublishStats {
    /// Readings handed to the sink.
    pub attempted: u64,
    pub published: u64,
    pub failed: u64,
    /// Readings that never reached the sink because they failed to encode.
    pub dropped: u64,
}

pub struct TelemetryPublisher<S, R> {
    sink: S,
    rng: R,
    interval: Duration,
    sleep_on_serialize_error: bool,
    encoder: Encoder,
}

impl<S, R> TelemetryPublisher<S, R>
where
    S: MessageSink,
    R: Rng,
{
    pub fn new(sink: S, rng: R, interval: Duration) -> Self {
        TelemetryPublisher {
            sink,
            rng,
            interval,
            sleep_on_serialize_error: true,
            encoder: Box::new(|reading: &Reading| reading.to_payload()),
        }
    }

    pub fn from_config(sink: S, rng: R, config: &Config) -> Self {
        TelemetryPublisher::new(sink, rng, config.interval)
            .sleep_on_serialize_error(config.sleep_on_serialize_error)
    }

    pub fn sleep_on_serialize_error(mut self, enabled: bool) -> Self {
        self.sleep_on_serialize_error = enabled;
        self
    }

    pub fn with_encoder(mut self, encoder: Encoder) -> Self {
        self.encoder = encoder;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn into_sink(self) -> S {
        self.sink
    }

    /// Generates, encodes and publishes one reading per interval until
    /// `shutdown` turns true or its sender goes away.
    ///
    /// Failures never leave the loop: the reading is logged and dropped and
    /// the next iteration starts from a fresh one.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> PublishStats {
        let mut stats = PublishStats::default();
        info!("Publishing a reading every {:?}", self.interval);

        loop {
            if *shutdown.borrow() {
                break;
            }

            let reading = Reading::generate(&mut self.rng);
            match self.publish_reading(&reading).await {
                Ok(()) => {
                    stats.attempted += 1;
                    stats.published += 1;
                    info!(
                        "Published reading: temperature={:.2}°C humidity={:.2}%",
                        reading.temperature, reading.humidity
                    );
                }
                Err(e @ ProducerError::Serialize(_)) => {
                    stats.dropped += 1;
                    error!("{}", e);
                    if !self.sleep_on_serialize_error {
                        // Nothing else awaits on this path; give the shutdown
                        // sender and timers a turn before the next attempt.
                        tokio::task::yield_now().await;
                        continue;
                    }
                }
                Err(e) => {
                    stats.attempted += 1;
                    stats.failed += 1;
                    error!("{}", e);
                }
            }

            tokio::select! {
                _ = tokio::time::sleep(self.interval) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(
            "Publisher stopped: {} published, {} failed, {} dropped",
            stats.published, stats.failed, stats.dropped
        );
        stats
    }

    async fn publish_reading(&mut self, reading: &Reading) -> Result<()> {
        let payload = (self.encoder)(reading)?;
        self.sink.publish(&payload).await
    }
}
