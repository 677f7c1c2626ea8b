pub mod consumer;
pub mod producer;

pub use consumer::MovingAverageConsumer;
pub use producer::KafkaPricePublisher;
