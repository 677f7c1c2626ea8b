use std::sync::Arc;
use tracing::{debug, info, Instrument};
use crate::error::{Error, Result};
use crate::events::PriceObservedEvent;
use crate::interfaces::PriceStore;
use crate::moving_average::calculator::window_average;
use crate::observability::metrics::{
    MOVING_AVERAGES_RECORDED, PRICE_EVENTS_INSUFFICIENT_DATA, PRICE_EVENTS_MALFORMED,
};
use crate::observability::tracing::price_event_span;
use crate::storage::models::{MovingAverageRecord, NewMovingAverage};

#[derive(Clone, Debug, PartialEq)]
pub enum Outcome {
    Recorded(MovingAverageRecord),
    InsufficientData { have: usize, need: usize },
}

/// Turns price events into moving-average records. Broker independent.
pub struct MovingAverageProcessor {
    store: Arc<dyn PriceStore>,
    period: usize,
}

impl MovingAverageProcessor {
    pub fn new(store: Arc<dyn PriceStore>, period: usize) -> Result<Self> {
        if period == 0 {
            return Err(Error::ConfigError("moving average period must be at least 1".to_string()));
        }
        Ok(MovingAverageProcessor { store, period })
    }

    pub fn period(&self) -> usize {
        self.period
    }

    /// Decodes one stream payload and processes it.
    ///
    /// Empty or undecodable payloads yield `MalformedEvent`.
    pub async fn handle_payload(&self, payload: Option<&[u8]>) -> Result<Outcome> {
        let decoded = match payload {
            None | Some([]) => Err(Error::MalformedEvent("empty payload".to_string())),
            Some(bytes) => PriceObservedEvent::from_json(bytes),
        };

        match decoded {
            Ok(event) => self.on_event(&event).await,
            Err(e) => {
                PRICE_EVENTS_MALFORMED.inc();
                Err(e)
            }
        }
    }

    /// Recomputes the average from the store; the event only names the symbol.
    pub async fn on_event(&self, event: &PriceObservedEvent) -> Result<Outcome> {
        let span = price_event_span(&event.symbol);

        async move {
            let window = self.store.recent_price_points(&event.symbol, self.period).await?;

            let Some(average_price) = window_average(&window, self.period) else {
                PRICE_EVENTS_INSUFFICIENT_DATA.inc();
                debug!(have = window.len(), need = self.period, "Not enough price points yet");
                return Ok(Outcome::InsufficientData { have: window.len(), need: self.period });
            };

            let record = self.store
                .insert_moving_average(NewMovingAverage {
                    symbol: event.symbol.clone(),
                    average_price,
                    period: self.period,
                })
                .await?;

            MOVING_AVERAGES_RECORDED.inc();
            info!(average_price, period = self.period, "Recorded moving average");
            Ok(Outcome::Recorded(record))
        }
        .instrument(span)
        .await
    }
}
