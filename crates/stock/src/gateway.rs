//! Product-type dispatch over the two stock endpoints.

use std::sync::Arc;

use ordergate_core::ProductId;

use crate::client::{ReservationStockClient, StockClient};
use crate::error::StockError;
use crate::product_type::ProductType;
use crate::snapshot::StockSnapshot;

/// Typed entry point to the stock service.
///
/// The endpoint is always chosen from the [`ProductType`] the caller passes in,
/// never from the shape of a response.
#[derive(Clone)]
pub struct StockGateway {
    direct: Arc<dyn StockClient>,
    reservation: Arc<dyn ReservationStockClient>,
}

impl StockGateway {
    pub fn new(
        direct: Arc<dyn StockClient>,
        reservation: Arc<dyn ReservationStockClient>,
    ) -> Self {
        Self {
            direct,
            reservation,
        }
    }

    /// Fresh stock reading for a product.
    ///
    /// Direct-sale products never carry an opening instant.
    pub async fn snapshot(
        &self,
        product_type: ProductType,
        product_id: ProductId,
    ) -> Result<StockSnapshot, StockError> {
        match product_type {
            ProductType::DirectSale => {
                let remaining = self.direct.remaining(product_id).await?;
                Ok(StockSnapshot::direct(remaining))
            }
            ProductType::ReservationWindow => self.reservation.snapshot(product_id).await,
        }
    }

    pub async fn decrease(
        &self,
        product_type: ProductType,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StockError> {
        tracing::debug!(%product_id, %product_type, quantity, "decreasing stock");
        match product_type {
            ProductType::DirectSale => self.direct.decrease(product_id, quantity).await,
            ProductType::ReservationWindow => {
                self.reservation.decrease(product_id, quantity).await
            }
        }
    }

    pub async fn increase(
        &self,
        product_type: ProductType,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StockError> {
        tracing::debug!(%product_id, %product_type, quantity, "increasing stock");
        match product_type {
            ProductType::DirectSale => self.direct.increase(product_id, quantity).await,
            ProductType::ReservationWindow => {
                self.reservation.increase(product_id, quantity).await
            }
        }
    }
}

impl core::fmt::Debug for StockGateway {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockGateway").finish_non_exhaustive()
    }
}
