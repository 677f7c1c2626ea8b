use crate::config::KafkaConfig;
use crate::error::{Error, Result};
use crate::moving_average::{MovingAverageProcessor, Outcome};
use rdkafka::config::ClientConfig;
use rdkafka::consumer::{CommitMode, Consumer, StreamConsumer};
use rdkafka::message::{BorrowedMessage, Message};
use rdkafka::Offset;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const SEEK_TIMEOUT: Duration = Duration::from_secs(5);

/// Feeds the price topic into a [`MovingAverageProcessor`].
///
/// Offsets are committed by hand once a message has been fully handled, so a
/// crash or a store failure leads to redelivery rather than loss.
pub struct MovingAverageConsumer {
    consumer: StreamConsumer,
    topic: String,
    processor: MovingAverageProcessor,
    retry_backoff: Duration,
}

impl MovingAverageConsumer {
    pub fn new(config: &KafkaConfig, processor: MovingAverageProcessor, retry_backoff: Duration) -> Result<Self> {
        let consumer: StreamConsumer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("group.id", &config.group_id)
            .set("enable.auto.commit", "false")
            .set("auto.offset.reset", "earliest")
            .create()
            .map_err(|e| Error::KafkaError(e.to_string()))?;

        consumer.subscribe(&[config.topic.as_str()])
            .map_err(|e| Error::KafkaError(e.to_string()))?;

        Ok(MovingAverageConsumer {
            consumer,
            topic: config.topic.clone(),
            processor,
            retry_backoff,
        })
    }

    /// Runs until `shutdown` fires. A message already being handled is
    /// finished first.
    pub async fn run(&self, shutdown: CancellationToken) -> Result<()> {
        info!(topic = %self.topic, period = self.processor.period(), "Moving average consumer started");

        loop {
            let received = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                received = self.consumer.recv() => received,
            };

            let message = match received {
                Ok(message) => message,
                Err(e) => {
                    warn!(error = %e, "Kafka receive failed");
                    if !self.backoff(&shutdown).await {
                        break;
                    }
                    continue;
                }
            };

            match self.processor.handle_payload(message.payload()).await {
                Ok(Outcome::Recorded(_)) | Ok(Outcome::InsufficientData { .. }) => self.commit(&message),
                Err(Error::MalformedEvent(reason)) => {
                    warn!(
                        partition = message.partition(),
                        offset = message.offset(),
                        reason = %reason,
                        "Skipping malformed price event"
                    );
                    self.commit(&message);
                }
                Err(e) => {
                    error!(
                        partition = message.partition(),
                        offset = message.offset(),
                        error = %e,
                        "Failed to process price event, will retry"
                    );
                    self.rewind(&message);
                    if !self.backoff(&shutdown).await {
                        break;
                    }
                }
            }
        }

        self.consumer.unsubscribe();
        info!("Moving average consumer stopped");
        Ok(())
    }

    fn commit(&self, message: &BorrowedMessage<'_>) {
        match self.consumer.commit_message(message, CommitMode::Async) {
            Ok(()) => debug!(partition = message.partition(), offset = message.offset(), "Committed"),
            Err(e) => warn!(error = %e, "Offset commit failed"),
        }
    }

    fn rewind(&self, message: &BorrowedMessage<'_>) {
        if let Err(e) = self.consumer.seek(
            message.topic(),
            message.partition(),
            Offset::Offset(message.offset()),
            SEEK_TIMEOUT,
        ) {
            warn!(error = %e, "Seek to failed offset did not succeed");
        }
    }

    async fn backoff(&self, shutdown: &CancellationToken) -> bool {
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            _ = tokio::time::sleep(self.retry_backoff) => true,
        }
    }
}
