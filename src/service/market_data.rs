use std::sync::Arc;
use crate::error::{ProviderError, Result};
use crate::events::price::PriceObservedEvent;
use crate::interfaces::{PricePublisher, PriceStore};
use crate::observability::metrics::{
    PRICE_EVENTS_PUBLISHED, PRICE_EVENT_PUBLISH_FAILURES, PRICE_FETCHES, PRICE_FETCH_LATENCY,
};
use crate::price_infra::connectors::ProviderSet;
use crate::price_infra::ProviderId;
use crate::storage::models::{NewPricePoint, NewRawRecord, PricePoint};
use crate::types::Symbol;

/// Outcome of one successful fetch.
#[derive(Clone, Debug)]
pub struct RecordedPrice {
    pub point: PricePoint,
    /// False when the event could not be handed to the stream.
    pub published: bool,
}

/// Fetches a price, stores it, and announces it on the event stream.
pub struct MarketDataService {
    providers: ProviderSet,
    store: Arc<dyn PriceStore>,
    publisher: Arc<dyn PricePublisher>,
}

impl MarketDataService {
    pub fn new(
        providers: ProviderSet,
        store: Arc<dyn PriceStore>,
        publisher: Arc<dyn PricePublisher>,
    ) -> Self {
        MarketDataService { providers, store, publisher }
    }

    pub fn providers(&self) -> &ProviderSet {
        &self.providers
    }

    pub fn store(&self) -> &Arc<dyn PriceStore> {
        &self.store
    }

    pub async fn fetch_and_record(&self, symbol: &Symbol, provider_id: ProviderId) -> Result<RecordedPrice> {
        let provider = self.providers.get(provider_id)?;

        if !provider.validate_symbol(symbol) {
            return Err(ProviderError::InvalidSymbol {
                provider: provider_id.as_str(),
                symbol: symbol.to_string(),
            }
            .into());
        }

        let timer = PRICE_FETCH_LATENCY
            .with_label_values(&[provider_id.as_str()])
            .start_timer();
        let fetched = provider.fetch_latest(symbol).await;
        timer.observe_duration();

        let quote = match fetched {
            Ok(quote) => {
                PRICE_FETCHES.with_label_values(&[provider_id.as_str(), "success"]).inc();
                quote
            }
            Err(e) => {
                PRICE_FETCHES.with_label_values(&[e.provider(), "error"]).inc();
                return Err(e.into());
            }
        };

        let (raw, point) = self.store
            .record_observation(
                NewRawRecord {
                    symbol: quote.symbol.clone(),
                    provider: provider_id,
                    payload: quote.raw_payload,
                },
                NewPricePoint {
                    symbol: quote.symbol,
                    price: quote.price,
                    timestamp: quote.timestamp,
                    provider: provider_id,
                },
            )
            .await?;

        tracing::info!(symbol = %point.symbol, price = %point.price, provider = %provider_id, "Stored price");

        let event = PriceObservedEvent {
            symbol: point.symbol.clone(),
            price: point.price,
            timestamp: point.timestamp,
            source: provider_id.to_string(),
            raw_response_id: Some(raw.id),
        };

        let published = match self.publisher.publish(&event).await {
            Ok(()) => {
                PRICE_EVENTS_PUBLISHED.inc();
                true
            }
            Err(e) => {
                PRICE_EVENT_PUBLISH_FAILURES.inc();
                tracing::warn!(symbol = %event.symbol, error = %e, "Price event not published");
                false
            }
        };

        Ok(RecordedPrice { point, published })
    }
}
