//! Purchasing: stock-checked purchase creation and the purchase lifecycle.
//!
//! [`PurchaseCoordinator`] verifies and reserves stock through the
//! [`StockGateway`](ordergate_stock::StockGateway) before a purchase is stored,
//! then serves status updates, lookups and cancellation. Storage sits behind
//! [`PurchaseStore`]; the read-then-decrement sequence is serialised per
//! product through a [`StockLock`].

pub mod coordinator;
pub mod error;
pub mod lock;
pub mod purchase;
pub mod request;
pub mod store;

pub use coordinator::PurchaseCoordinator;
pub use error::PurchaseError;
pub use lock::{InProcessStockLock, LockError, NoStockLock, StockLease, StockLock};
pub use purchase::{NewPurchase, ParsePurchaseStatusError, ProductRef, Purchase, PurchaseStatus};
pub use request::{PurchaseOrder, PurchaseRequest};
pub use store::{InMemoryPurchaseStore, PurchaseStore, StoreError};
