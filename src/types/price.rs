use serde::{Deserialize, Serialize};
use std::fmt;

/// Observed price. Always finite and strictly positive.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Price(f64);

impl Price {
    pub fn new(value: f64) -> Result<Self, InvalidPrice> {
        if value.is_finite() && value > 0.0 {
            Ok(Price(value))
        } else {
            Err(InvalidPrice(value))
        }
    }

    pub fn to_f64(&self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for Price {
    type Error = InvalidPrice;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Price::new(value)
    }
}

impl From<Price> for f64 {
    fn from(price: Price) -> f64 {
        price.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InvalidPrice(pub f64);

impl fmt::Display for InvalidPrice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "price must be finite and positive, got {}", self.0)
    }
}

impl std::error::Error for InvalidPrice {}
