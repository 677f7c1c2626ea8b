pub mod memory;
pub mod models;

pub use memory::InMemoryPriceStore;
pub use models::{JobStatus, MovingAverageRecord, PollingJob, PricePoint};
