pub mod price_publisher;
pub mod price_store;

pub use price_publisher::PricePublisher;
pub use price_store::PriceStore;
