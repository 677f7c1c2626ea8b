use crate::events::price::PriceObservedEvent;
use crate::error::Result;
use async_trait::async_trait;

/// Outbound side of the price-events stream. Delivery is best-effort: callers
/// count failures and carry on.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricePublisher: Send + Sync {
    async fn publish(&self, event: &PriceObservedEvent) -> Result<()>;
}
