//! Stock service access.
//!
//! The stock service owns inventory counts. Two product types are sold and each
//! is served by its own endpoint: direct-sale stock is a plain counter, while
//! reservation-window stock also carries the instant at which ordering opens.
//!
//! - [`StockClient`] / [`ReservationStockClient`]: one client per endpoint.
//! - [`StockGateway`]: dispatches on [`ProductType`] to the matching client.
//! - [`HttpStockClient`] / [`HttpReservationStockClient`]: the real transport.
//! - [`InMemoryStockService`]: in-process stand-in for tests and local runs.

pub mod client;
pub mod error;
pub mod gateway;
pub mod http;
pub mod in_memory;
pub mod product_type;
pub mod snapshot;

pub use client::{ReservationStockClient, StockClient};
pub use error::StockError;
pub use gateway::StockGateway;
pub use http::{HttpReservationStockClient, HttpStockClient, HttpStockConfig, ServiceZone};
pub use in_memory::{InMemoryStockService, StockCall};
pub use product_type::{ParseProductTypeError, ProductType};
pub use snapshot::StockSnapshot;
