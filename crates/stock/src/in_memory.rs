//! In-process stock endpoint with call recording.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use ordergate_core::ProductId;

use crate::client::{ReservationStockClient, StockClient};
use crate::error::StockError;
use crate::snapshot::StockSnapshot;

/// A call received by [`InMemoryStockService`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StockCall {
    Remaining(ProductId),
    Snapshot(ProductId),
    Decrease(ProductId, u32),
    Increase(ProductId, u32),
}

#[derive(Debug, Clone, Copy, Default)]
struct StockEntry {
    remaining: i64,
    opens_at: Option<DateTime<Utc>>,
}

/// In-process stock endpoint for tests/dev.
///
/// Unknown products read as zero stock. A decrement that would take stock below
/// zero is refused with a 409, the way a stock service with a conditional
/// decrement answers. Every call is recorded, including failed ones.
#[derive(Debug, Default)]
pub struct InMemoryStockService {
    stock: RwLock<HashMap<ProductId, StockEntry>>,
    calls: Mutex<Vec<StockCall>>,
    unreachable: AtomicBool,
}

impl InMemoryStockService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_stock(&self, product_id: ProductId, remaining: i64) {
        let mut map = self.stock.write().unwrap_or_else(PoisonError::into_inner);
        map.entry(product_id).or_default().remaining = remaining;
    }

    pub fn set_reservation(
        &self,
        product_id: ProductId,
        remaining: i64,
        opens_at: Option<DateTime<Utc>>,
    ) {
        let mut map = self.stock.write().unwrap_or_else(PoisonError::into_inner);
        map.insert(product_id, StockEntry { remaining, opens_at });
    }

    /// Make every subsequent call fail with a transport error.
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, Ordering::SeqCst);
    }

    pub fn stock(&self, product_id: ProductId) -> Option<i64> {
        let map = self.stock.read().ok()?;
        map.get(&product_id).map(|e| e.remaining)
    }

    pub fn calls(&self) -> Vec<StockCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Number of decrement calls received, successful or not.
    pub fn decrease_count(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, StockCall::Decrease(..)))
            .count()
    }

    fn record(&self, call: StockCall) -> Result<(), StockError> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
        if self.unreachable.load(Ordering::SeqCst) {
            return Err(StockError::transport("connection refused"));
        }
        Ok(())
    }

    fn entry(&self, product_id: ProductId) -> Result<StockEntry, StockError> {
        let map = self
            .stock
            .read()
            .map_err(|_| StockError::transport("stock table poisoned"))?;
        Ok(map.get(&product_id).copied().unwrap_or_default())
    }
}

#[async_trait]
impl StockClient for InMemoryStockService {
    async fn decrease(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        self.record(StockCall::Decrease(product_id, quantity))?;

        let mut map = self
            .stock
            .write()
            .map_err(|_| StockError::transport("stock table poisoned"))?;
        let entry = map.entry(product_id).or_default();
        let quantity = i64::from(quantity);
        if entry.remaining < quantity {
            return Err(StockError::Status {
                status: 409,
                body: format!(
                    "insufficient stock for product {product_id}: {} < {quantity}",
                    entry.remaining
                ),
            });
        }
        entry.remaining -= quantity;
        Ok(())
    }

    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        self.record(StockCall::Increase(product_id, quantity))?;

        let mut map = self
            .stock
            .write()
            .map_err(|_| StockError::transport("stock table poisoned"))?;
        map.entry(product_id).or_default().remaining += i64::from(quantity);
        Ok(())
    }

    async fn remaining(&self, product_id: ProductId) -> Result<i64, StockError> {
        self.record(StockCall::Remaining(product_id))?;
        Ok(self.entry(product_id)?.remaining)
    }
}

#[async_trait]
impl ReservationStockClient for InMemoryStockService {
    async fn snapshot(&self, product_id: ProductId) -> Result<StockSnapshot, StockError> {
        self.record(StockCall::Snapshot(product_id))?;
        let entry = self.entry(product_id)?;
        Ok(StockSnapshot::reservation(entry.remaining, entry.opens_at))
    }
}
