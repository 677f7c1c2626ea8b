use crate::config::KafkaConfig;
use crate::events::price::PriceObservedEvent;
use crate::error::{Error, Result};
use crate::interfaces::price_publisher::PricePublisher;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::config::ClientConfig;
use async_trait::async_trait;
use std::time::Duration;

pub struct KafkaPricePublisher {
    producer: FutureProducer,
    topic: String,
    queue_timeout: Duration,
}

impl KafkaPricePublisher {
    pub fn new(config: &KafkaConfig) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", &config.brokers)
            .set("client.id", &config.client_id)
            .set("acks", "all")
            .set("compression.type", "gzip")
            .set("message.timeout.ms", config.message_timeout_ms.to_string())
            .set("queue.buffering.max.messages", "100000")
            .set("queue.buffering.max.ms", "100")
            .set("batch.num.messages", "500")
            .create()
            .map_err(|e| Error::KafkaError(e.to_string()))?;

        Ok(KafkaPricePublisher {
            producer,
            topic: config.topic.clone(),
            queue_timeout: Duration::from_millis(config.message_timeout_ms),
        })
    }

    /// Waits for queued messages to be delivered; call before exiting.
    pub fn flush(&self, timeout: Duration) -> Result<()> {
        self.producer
            .flush(timeout)
            .map_err(|e| Error::KafkaError(e.to_string()))
    }
}

#[async_trait]
impl PricePublisher for KafkaPricePublisher {
    async fn publish(&self, event: &PriceObservedEvent) -> Result<()> {
        let payload = event.to_json()?;

        let record = FutureRecord::to(&self.topic)
            .payload(&payload)
            .key(event.key());

        self.producer
            .send(record, self.queue_timeout)
            .await
            .map_err(|(e, _)| Error::KafkaError(e.to_string()))?;

        tracing::debug!(symbol = %event.symbol, topic = %self.topic, "Price event delivered");
        Ok(())
    }
}
