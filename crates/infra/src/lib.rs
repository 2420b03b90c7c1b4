//! Infrastructure layer: configuration, PostgreSQL persistence, wiring.

pub mod bootstrap;
pub mod config;
pub mod postgres;

pub use bootstrap::{build_coordinator, Coordinator};
pub use config::{Config, ConfigError, LogFormat, StockLockKind};
pub use postgres::PgPurchaseStore;
