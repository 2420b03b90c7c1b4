//! Boundary input for purchase creation.

use serde::{Deserialize, Serialize};

use ordergate_core::{ProductId, UserId};
use ordergate_stock::ProductType;

use crate::error::PurchaseError;
use crate::purchase::PurchaseStatus;

/// Raw purchase request as received from a caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product_type: String,
    pub address: String,
    pub status: String,
}

/// A validated purchase request. Enumerations are typed from here on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PurchaseOrder {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub product_type: ProductType,
    pub address: String,
    pub status: PurchaseStatus,
}

impl PurchaseRequest {
    /// Parse every string-typed field once. No IO happens here.
    pub fn validate(self) -> Result<PurchaseOrder, PurchaseError> {
        let product_type = self
            .product_type
            .parse::<ProductType>()
            .map_err(|e| PurchaseError::InvalidProductType(e.0))?;

        if self.quantity == 0 {
            return Err(PurchaseError::InvalidQuantity);
        }

        let status = self
            .status
            .parse::<PurchaseStatus>()
            .map_err(|e| PurchaseError::InvalidPurchaseStatus(e.0))?;

        Ok(PurchaseOrder {
            user_id: self.user_id,
            product_id: self.product_id,
            quantity: self.quantity,
            product_type,
            address: self.address,
            status,
        })
    }
}
