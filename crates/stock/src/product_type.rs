//! Product type: which stock endpoint a product lives behind.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed set of sellable product kinds.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductType {
    /// Sold straight from stock, no time gate.
    #[serde(rename = "product", alias = "direct_sale")]
    DirectSale,
    /// Orderable only once its reservation window has opened.
    #[serde(rename = "reservation_product", alias = "reservation_window")]
    ReservationWindow,
}

impl ProductType {
    pub const ALL: [ProductType; 2] = [ProductType::DirectSale, ProductType::ReservationWindow];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductType::DirectSale => "product",
            ProductType::ReservationWindow => "reservation_product",
        }
    }
}

impl fmt::Display for ProductType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown product type '{0}'")]
pub struct ParseProductTypeError(pub String);

impl FromStr for ProductType {
    type Err = ParseProductTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "product" | "direct_sale" | "direct-sale" => Ok(ProductType::DirectSale),
            "reservation_product" | "reservation" | "reservation_window"
            | "reservation-window" => Ok(ProductType::ReservationWindow),
            _ => Err(ParseProductTypeError(s.to_string())),
        }
    }
}
