pub mod price;

pub use price::PriceObservedEvent;
