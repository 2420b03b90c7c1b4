//! Per-product leases around the stock read-then-decrement sequence.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use thiserror::Error;

use ordergate_core::ProductId;

/// Lease acquisition failure.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LockError {
    /// The underlying lock table was poisoned (a holder panicked).
    #[error("lock poisoned: {0}")]
    Poisoned(String),
}

/// Proof of exclusive access to one product's stock. Released on drop.
pub struct StockLease {
    guard: Option<Box<dyn Send + Sync>>,
}

impl StockLease {
    /// Wrap whatever guard keeps the lease alive.
    pub fn new(guard: impl Send + Sync + 'static) -> Self {
        Self {
            guard: Some(Box::new(guard)),
        }
    }

    /// A lease that guards nothing.
    pub fn unguarded() -> Self {
        Self { guard: None }
    }

    pub fn is_guarded(&self) -> bool {
        self.guard.is_some()
    }
}

impl core::fmt::Debug for StockLease {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("StockLease")
            .field("guarded", &self.is_guarded())
            .finish()
    }
}

/// Source of per-product leases.
///
/// Implementations backed by Redis, Postgres advisory locks, etc. can slot in
/// here to serialise purchases across processes.
#[async_trait]
pub trait StockLock: Send + Sync {
    /// Wait until the product is free and return a lease on it.
    async fn acquire(&self, product_id: ProductId) -> Result<StockLease, LockError>;
}

#[async_trait]
impl<L> StockLock for Arc<L>
where
    L: StockLock + ?Sized,
{
    async fn acquire(&self, product_id: ProductId) -> Result<StockLease, LockError> {
        (**self).acquire(product_id).await
    }
}

/// No serialisation. For stock services that decrement conditionally and
/// atomically on their side.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoStockLock;

#[async_trait]
impl StockLock for NoStockLock {
    async fn acquire(&self, _product_id: ProductId) -> Result<StockLease, LockError> {
        Ok(StockLease::unguarded())
    }
}

/// Entries are pruned once the table grows past this size.
const PRUNE_THRESHOLD: usize = 1024;

/// One async mutex per product id, shared by every caller in this process.
///
/// Purchases of the same product queue up; different products do not contend.
#[derive(Debug, Default)]
pub struct InProcessStockLock {
    locks: Mutex<HashMap<ProductId, Arc<tokio::sync::Mutex<()>>>>,
}

impl InProcessStockLock {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_for(&self, product_id: ProductId) -> Result<Arc<tokio::sync::Mutex<()>>, LockError> {
        let mut locks = self
            .locks
            .lock()
            .map_err(|_| LockError::Poisoned("stock lock table poisoned".into()))?;

        if locks.len() > PRUNE_THRESHOLD {
            // Only this table holds a reference: nobody owns or awaits the lock.
            locks.retain(|_, m| Arc::strong_count(m) > 1);
        }

        Ok(locks.entry(product_id).or_default().clone())
    }

    /// Number of products currently tracked.
    pub fn tracked(&self) -> usize {
        self.locks.lock().map(|l| l.len()).unwrap_or(0)
    }
}

#[async_trait]
impl StockLock for InProcessStockLock {
    async fn acquire(&self, product_id: ProductId) -> Result<StockLease, LockError> {
        let lock = self.lock_for(product_id)?;
        let guard = lock.lock_owned().await;
        Ok(StockLease::new(guard))
    }
}
