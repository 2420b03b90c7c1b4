//! Purchase coordination errors.

use chrono::{DateTime, Utc};
use thiserror::Error;

use ordergate_core::PurchaseId;
use ordergate_stock::StockError;

use crate::lock::LockError;
use crate::store::StoreError;

/// Every failure the coordinator can surface. Nothing is retried or swallowed.
#[derive(Debug, Error)]
pub enum PurchaseError {
    #[error("invalid product type: '{0}'")]
    InvalidProductType(String),

    #[error("invalid purchase status: '{0}'")]
    InvalidPurchaseStatus(String),

    #[error("quantity must be positive")]
    InvalidQuantity,

    /// The reservation window has not opened yet.
    #[error("purchase not available until {opens_at}")]
    PurchaseNotAvailable { opens_at: DateTime<Utc> },

    #[error("insufficient stock: {remaining} remaining, {requested} requested")]
    InsufficientStock { remaining: i64, requested: u32 },

    #[error("purchase {0} not found")]
    PurchaseNotFound(PurchaseId),

    #[error("stock service call failed: {0}")]
    RemoteCallFailure(#[from] StockError),

    #[error("purchase store failed: {0}")]
    Store(#[from] StoreError),

    #[error("stock lease failed: {0}")]
    Lock(#[from] LockError),
}

impl PurchaseError {
    /// Stable machine-readable code for callers that render errors.
    pub fn code(&self) -> &'static str {
        match self {
            PurchaseError::InvalidProductType(_) => "invalid_product_type",
            PurchaseError::InvalidPurchaseStatus(_) => "invalid_purchase_status",
            PurchaseError::InvalidQuantity => "invalid_quantity",
            PurchaseError::PurchaseNotAvailable { .. } => "purchase_not_available",
            PurchaseError::InsufficientStock { .. } => "insufficient_stock",
            PurchaseError::PurchaseNotFound(_) => "purchase_not_found",
            PurchaseError::RemoteCallFailure(_) => "remote_call_failure",
            PurchaseError::Store(_) => "store_error",
            PurchaseError::Lock(_) => "lock_error",
        }
    }
}
