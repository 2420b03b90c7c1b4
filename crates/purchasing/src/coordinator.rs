//! Purchase coordination.
//!
//! ```text
//! PurchaseRequest
//!   ↓ validate (product type, quantity, status; no IO)
//! PurchaseOrder
//!   ↓ acquire stock lease for the product
//!   ↓ read stock (endpoint chosen by product type)
//!   ↓ reservation window open?        → PurchaseNotAvailable
//!   ↓ remaining >= quantity?          → InsufficientStock
//!   ↓ decrease stock (same endpoint)
//!   ↓ release lease
//!   ↓ persist purchase
//! PurchaseId
//! ```
//!
//! A persistence failure after a successful decrement is surfaced as-is; the
//! decrement is not compensated.

use std::sync::Arc;

use ordergate_core::{Clock, Page, PageRequest, PurchaseId, SystemClock, UserId};
use ordergate_stock::{ProductType, StockGateway};

use crate::error::PurchaseError;
use crate::lock::{InProcessStockLock, StockLock};
use crate::purchase::{NewPurchase, ProductRef, Purchase, PurchaseStatus};
use crate::request::{PurchaseOrder, PurchaseRequest};
use crate::store::PurchaseStore;

/// Orchestrates stock reservation and the purchase lifecycle.
///
/// Collaborators are injected; nothing here is global.
pub struct PurchaseCoordinator<S> {
    gateway: StockGateway,
    store: S,
    lock: Arc<dyn StockLock>,
    clock: Arc<dyn Clock>,
}

impl<S> PurchaseCoordinator<S>
where
    S: PurchaseStore,
{
    /// Coordinator with the system clock and an in-process stock lock.
    pub fn new(gateway: StockGateway, store: S) -> Self {
        Self {
            gateway,
            store,
            lock: Arc::new(InProcessStockLock::new()),
            clock: Arc::new(SystemClock),
        }
    }

    pub fn with_lock(mut self, lock: Arc<dyn StockLock>) -> Self {
        self.lock = lock;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Validate a raw request, reserve stock and persist the purchase.
    pub async fn create(&self, request: PurchaseRequest) -> Result<PurchaseId, PurchaseError> {
        let order = request.validate()?;
        self.place(order).await
    }

    /// Reserve stock for an already validated order and persist it.
    pub async fn place(&self, order: PurchaseOrder) -> Result<PurchaseId, PurchaseError> {
        if order.quantity == 0 {
            return Err(PurchaseError::InvalidQuantity);
        }

        self.reserve_stock(&order).await?;

        let new_purchase = NewPurchase {
            user_id: order.user_id,
            product_id: order.product_id,
            quantity: order.quantity,
            address: order.address,
            product_type: order.product_type,
            status: order.status,
            created_at: self.clock.now(),
        };

        let id = match self.store.save(new_purchase).await {
            Ok(id) => id,
            Err(err) => {
                tracing::error!(
                    product_id = %order.product_id,
                    product_type = %order.product_type,
                    quantity = order.quantity,
                    error = %err,
                    "stock was decreased but the purchase was not persisted"
                );
                return Err(err.into());
            }
        };

        tracing::info!(
            purchase_id = %id,
            user_id = %order.user_id,
            product_id = %order.product_id,
            product_type = %order.product_type,
            quantity = order.quantity,
            status = %order.status,
            "purchase created"
        );

        Ok(id)
    }

    /// Check availability and take the stock, under the product's lease.
    async fn reserve_stock(&self, order: &PurchaseOrder) -> Result<(), PurchaseError> {
        let product_type = order.product_type;
        let _lease = self.lock.acquire(order.product_id).await?;

        let snapshot = self.gateway.snapshot(product_type, order.product_id).await?;

        if product_type == ProductType::ReservationWindow {
            match snapshot.reservation_opens_at {
                Some(opens_at) if !snapshot.is_open_at(self.clock.now()) => {
                    tracing::debug!(product_id = %order.product_id, %opens_at, "reservation window not open");
                    return Err(PurchaseError::PurchaseNotAvailable { opens_at });
                }
                _ => {}
            }
        }

        if !snapshot.covers(order.quantity) {
            tracing::debug!(
                product_id = %order.product_id,
                remaining = snapshot.remaining,
                requested = order.quantity,
                "insufficient stock"
            );
            return Err(PurchaseError::InsufficientStock {
                remaining: snapshot.remaining,
                requested: order.quantity,
            });
        }

        self.gateway
            .decrease(product_type, order.product_id, order.quantity)
            .await?;

        Ok(())
    }

    /// A page of the user's payment-completed purchases.
    pub async fn purchases_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Purchase>, PurchaseError> {
        Ok(self.store.find_completed_by_user(user_id, page).await?)
    }

    pub async fn find(&self, purchase_id: PurchaseId) -> Result<Purchase, PurchaseError> {
        self.store
            .find_by_id(purchase_id)
            .await?
            .ok_or(PurchaseError::PurchaseNotFound(purchase_id))
    }

    /// Overwrite the status. Any recognised status may follow any other.
    pub async fn update_status(
        &self,
        purchase_id: PurchaseId,
        status: &str,
    ) -> Result<Purchase, PurchaseError> {
        let mut purchase = self.find(purchase_id).await?;
        let status = status
            .parse::<PurchaseStatus>()
            .map_err(|e| PurchaseError::InvalidPurchaseStatus(e.0))?;

        let previous = purchase.status;
        purchase.update_status(status, self.clock.now());
        self.store.update(&purchase).await?;

        tracing::info!(%purchase_id, from = %previous, to = %status, "purchase status updated");
        Ok(purchase)
    }

    /// Product and quantity of a purchase.
    pub async fn find_product_ref(&self, purchase_id: PurchaseId) -> Result<ProductRef, PurchaseError> {
        Ok(self.find(purchase_id).await?.product_ref())
    }

    /// Force the purchase to `Cancelled`. Stock is not released.
    pub async fn cancel(&self, purchase_id: PurchaseId) -> Result<Purchase, PurchaseError> {
        let mut purchase = self.find(purchase_id).await?;
        purchase.cancel(self.clock.now());
        self.store.update(&purchase).await?;

        tracing::info!(%purchase_id, "purchase cancelled");
        Ok(purchase)
    }
}
