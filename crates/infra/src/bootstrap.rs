//! Composition root: turns a [`Config`] into a ready coordinator.

use std::sync::Arc;

use anyhow::Context;

use ordergate_purchasing::{
    InMemoryPurchaseStore, InProcessStockLock, NoStockLock, PurchaseCoordinator, PurchaseStore,
    StockLock,
};
use ordergate_stock::{HttpReservationStockClient, HttpStockClient, HttpStockConfig, StockGateway};

use crate::config::{Config, StockLockKind};
use crate::postgres::PgPurchaseStore;

/// Coordinator over whichever store the configuration selected.
pub type Coordinator = PurchaseCoordinator<Arc<dyn PurchaseStore>>;

pub async fn build_coordinator(config: &Config) -> anyhow::Result<Coordinator> {
    let gateway = build_gateway(config)?;
    let store = build_store(config).await?;

    Ok(PurchaseCoordinator::new(gateway, store).with_lock(build_lock(config.stock_lock)))
}

pub fn build_gateway(config: &Config) -> anyhow::Result<StockGateway> {
    let direct = endpoint(&config.stock_service_url, config);
    let reservation = endpoint(&config.reservation_stock_service_url, config);

    let direct = HttpStockClient::new(&direct).context("failed to build stock client")?;
    let reservation = HttpReservationStockClient::new(&reservation)
        .context("failed to build reservation stock client")?;

    Ok(StockGateway::new(Arc::new(direct), Arc::new(reservation)))
}

fn endpoint(base_url: &str, config: &Config) -> HttpStockConfig {
    let endpoint = HttpStockConfig::new(base_url).with_zone(config.stock_service_zone);
    match config.stock_request_timeout {
        Some(timeout) => endpoint.with_timeout(timeout),
        None => endpoint,
    }
}

async fn build_store(config: &Config) -> anyhow::Result<Arc<dyn PurchaseStore>> {
    let Some(url) = config.database_url.as_deref() else {
        tracing::warn!("DATABASE_URL not set; purchases are kept in memory only");
        return Ok(Arc::new(InMemoryPurchaseStore::new()));
    };

    let store = PgPurchaseStore::connect(url, config.database_max_connections)
        .await
        .context("failed to connect to Postgres")?;
    store
        .migrate()
        .await
        .context("failed to apply purchases schema")?;

    tracing::info!(max_connections = config.database_max_connections, "using Postgres purchase store");
    Ok(Arc::new(store))
}

pub fn build_lock(kind: StockLockKind) -> Arc<dyn StockLock> {
    match kind {
        StockLockKind::InProcess => Arc::new(InProcessStockLock::new()),
        StockLockKind::None => Arc::new(NoStockLock),
    }
}
