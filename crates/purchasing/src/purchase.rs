use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use ordergate_core::{ProductId, PurchaseId, UserId};
use ordergate_stock::ProductType;

/// Purchase status.
///
/// Transitions are not checked against a graph: any status may follow any
/// other. `Active` is the payment-completed state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Created,
    Active,
    PaymentFailed,
    Cancelled,
}

impl PurchaseStatus {
    pub const ALL: [PurchaseStatus; 4] = [
        PurchaseStatus::Created,
        PurchaseStatus::Active,
        PurchaseStatus::PaymentFailed,
        PurchaseStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Created => "CREATED",
            PurchaseStatus::Active => "ACTIVE",
            PurchaseStatus::PaymentFailed => "PAYMENT_FAILED",
            PurchaseStatus::Cancelled => "CANCELLED",
        }
    }

    /// Statuses that count as paid for the per-user listing.
    pub fn payment_completed() -> &'static [PurchaseStatus] {
        &[PurchaseStatus::Active]
    }

    pub fn is_payment_completed(&self) -> bool {
        Self::payment_completed().contains(self)
    }
}

impl core::fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown purchase status '{0}'")]
pub struct ParsePurchaseStatusError(pub String);

impl core::str::FromStr for PurchaseStatus {
    type Err = ParsePurchaseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(PurchaseStatus::Created),
            "active" => Ok(PurchaseStatus::Active),
            "payment_failed" => Ok(PurchaseStatus::PaymentFailed),
            "cancelled" | "canceled" => Ok(PurchaseStatus::Cancelled),
            _ => Err(ParsePurchaseStatusError(s.to_string())),
        }
    }
}

/// A purchase that has not been stored yet (no identity).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPurchase {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub address: String,
    pub product_type: ProductType,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
}

impl NewPurchase {
    /// Attach the identity assigned by the store.
    pub fn into_purchase(self, id: PurchaseId) -> Purchase {
        Purchase {
            id,
            user_id: self.user_id,
            product_id: self.product_id,
            quantity: self.quantity,
            address: self.address,
            product_type: self.product_type,
            status: self.status,
            created_at: self.created_at,
            updated_at: self.created_at,
        }
    }
}

/// A stored purchase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub id: PurchaseId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub address: String,
    pub product_type: ProductType,
    pub status: PurchaseStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Purchase {
    pub fn update_status(&mut self, status: PurchaseStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
    }

    /// Force `Cancelled`, whatever the current status is.
    pub fn cancel(&mut self, at: DateTime<Utc>) {
        self.update_status(PurchaseStatus::Cancelled, at);
    }

    pub fn product_ref(&self) -> ProductRef {
        ProductRef {
            product_id: self.product_id,
            quantity: self.quantity,
        }
    }
}

/// Subject and quantity of a purchase, for collaborators that need nothing else
/// (payment, restock).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRef {
    pub product_id: ProductId,
    pub quantity: u32,
}
