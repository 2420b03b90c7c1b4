//! Client seams over one stock endpoint.

use std::sync::Arc;

use async_trait::async_trait;
use ordergate_core::ProductId;

use crate::error::StockError;
use crate::snapshot::StockSnapshot;

/// Operations every stock endpoint supports, keyed by product id.
///
/// Each call is a single remote invocation. Implementations must not retry.
#[async_trait]
pub trait StockClient: Send + Sync {
    /// Take `quantity` units out of stock.
    async fn decrease(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError>;

    /// Put `quantity` units back into stock.
    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError>;

    /// Current remaining stock.
    async fn remaining(&self, product_id: ProductId) -> Result<i64, StockError>;
}

/// Reservation-window endpoint: also reports when ordering opens.
#[async_trait]
pub trait ReservationStockClient: StockClient {
    /// Combined read of remaining stock and the opening instant.
    async fn snapshot(&self, product_id: ProductId) -> Result<StockSnapshot, StockError>;
}

#[async_trait]
impl<S> StockClient for Arc<S>
where
    S: StockClient + ?Sized,
{
    async fn decrease(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        (**self).decrease(product_id, quantity).await
    }

    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        (**self).increase(product_id, quantity).await
    }

    async fn remaining(&self, product_id: ProductId) -> Result<i64, StockError> {
        (**self).remaining(product_id).await
    }
}

#[async_trait]
impl<S> ReservationStockClient for Arc<S>
where
    S: ReservationStockClient + ?Sized,
{
    async fn snapshot(&self, product_id: ProductId) -> Result<StockSnapshot, StockError> {
        (**self).snapshot(product_id).await
    }
}
