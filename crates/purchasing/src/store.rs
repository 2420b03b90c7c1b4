//! Purchase persistence boundary.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use thiserror::Error;

use ordergate_core::{Page, PageRequest, PurchaseId, SortDirection, UserId};

use crate::purchase::{NewPurchase, Purchase};

/// Store operation error (infrastructure, not domain).
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// `update` was called for a record the store does not hold.
    #[error("purchase {0} is not stored")]
    Missing(PurchaseId),

    /// A stored row could not be mapped back to a purchase.
    #[error("corrupt purchase record: {0}")]
    Corrupt(String),

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StoreError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}

/// Persistence collaborator for purchases.
///
/// Each method is one atomic operation on one record; there is no cross-record
/// locking.
#[async_trait]
pub trait PurchaseStore: Send + Sync {
    /// Persist a new purchase and return the identity the store assigned.
    async fn save(&self, purchase: NewPurchase) -> Result<PurchaseId, StoreError>;

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError>;

    /// One page of a user's payment-completed purchases, ordered by creation time.
    async fn find_completed_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Purchase>, StoreError>;

    /// Overwrite a stored purchase.
    async fn update(&self, purchase: &Purchase) -> Result<(), StoreError>;
}

#[async_trait]
impl<S> PurchaseStore for Arc<S>
where
    S: PurchaseStore + ?Sized,
{
    async fn save(&self, purchase: NewPurchase) -> Result<PurchaseId, StoreError> {
        (**self).save(purchase).await
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        (**self).find_by_id(id).await
    }

    async fn find_completed_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Purchase>, StoreError> {
        (**self).find_completed_by_user(user_id, page).await
    }

    async fn update(&self, purchase: &Purchase) -> Result<(), StoreError> {
        (**self).update(purchase).await
    }
}

/// In-memory purchase store for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryPurchaseStore {
    purchases: RwLock<HashMap<PurchaseId, Purchase>>,
}

impl InMemoryPurchaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stored purchase, in no particular order.
    pub fn all(&self) -> Vec<Purchase> {
        match self.purchases.read() {
            Ok(map) => map.values().cloned().collect(),
            Err(_) => vec![],
        }
    }
}

#[async_trait]
impl PurchaseStore for InMemoryPurchaseStore {
    async fn save(&self, purchase: NewPurchase) -> Result<PurchaseId, StoreError> {
        let id = PurchaseId::new();
        let mut map = self
            .purchases
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        map.insert(id, purchase.into_purchase(id));
        Ok(id)
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        let map = self
            .purchases
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        Ok(map.get(&id).cloned())
    }

    async fn find_completed_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Purchase>, StoreError> {
        let map = self
            .purchases
            .read()
            .map_err(|_| StoreError::backend("lock poisoned"))?;

        let mut matching: Vec<Purchase> = map
            .values()
            .filter(|p| p.user_id == user_id && p.status.is_payment_completed())
            .cloned()
            .collect();

        // Ids are time-ordered, so they break creation-time ties deterministically.
        matching.sort_by_key(|p| (p.created_at, p.id));
        if page.sort() == SortDirection::Desc {
            matching.reverse();
        }

        let total = matching.len() as u64;
        let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
        let items = matching
            .into_iter()
            .skip(offset)
            .take(page.size() as usize)
            .collect();

        Ok(Page::new(items, page, total))
    }

    async fn update(&self, purchase: &Purchase) -> Result<(), StoreError> {
        let mut map = self
            .purchases
            .write()
            .map_err(|_| StoreError::backend("lock poisoned"))?;
        match map.get_mut(&purchase.id) {
            Some(stored) => {
                *stored = purchase.clone();
                Ok(())
            }
            None => Err(StoreError::Missing(purchase.id)),
        }
    }
}
