pub mod ids;
pub mod price;
pub mod symbol;

pub use ids::{JobId, RawRecordId};
pub use price::Price;
pub use symbol::Symbol;
