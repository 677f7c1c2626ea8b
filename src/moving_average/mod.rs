pub mod calculator;
pub mod processor;

pub use processor::{MovingAverageProcessor, Outcome};
