//! PostgreSQL-backed purchase store.
//!
//! ## Error Mapping
//!
//! | SQLx error                        | StoreError |
//! |-----------------------------------|------------|
//! | row that cannot become a Purchase | `Corrupt`  |
//! | anything else                     | `Backend`  |
//!
//! `update` of an id with no row is `Missing`.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{FromRow, PgPool, Row};
use tracing::instrument;

use ordergate_core::{Page, PageRequest, ProductId, PurchaseId, SortDirection, UserId};
use ordergate_purchasing::{NewPurchase, Purchase, PurchaseStatus, PurchaseStore, StoreError};
use ordergate_stock::ProductType;

const CREATE_PURCHASES: &str = include_str!("sql/create_purchases.sql");

const SELECT_COLUMNS: &str = "id, user_id, product_id, quantity, address, product_type, status, created_at, updated_at";

/// Purchase store over a `purchases` table.
///
/// Every method is a single statement, so each is atomic on its own.
#[derive(Debug, Clone)]
pub struct PgPurchaseStore {
    pool: Arc<PgPool>,
}

impl PgPurchaseStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Open a pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Create the table and index if they do not exist.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(CREATE_PURCHASES)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl PurchaseStore for PgPurchaseStore {
    #[instrument(skip(self, purchase), fields(user_id = %purchase.user_id, product_id = %purchase.product_id), err)]
    async fn save(&self, purchase: NewPurchase) -> Result<PurchaseId, StoreError> {
        let id = PurchaseId::new();
        let record = purchase.into_purchase(id);

        sqlx::query(
            r#"
            INSERT INTO purchases
                (id, user_id, product_id, quantity, address, product_type, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(record.id.as_uuid())
        .bind(record.user_id.get())
        .bind(record.product_id.get())
        .bind(quantity_to_db(record.quantity)?)
        .bind(&record.address)
        .bind(record.product_type.as_str())
        .bind(record.status.as_str())
        .bind(record.created_at)
        .bind(record.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("insert_purchase", e))?;

        Ok(id)
    }

    async fn find_by_id(&self, id: PurchaseId) -> Result<Option<Purchase>, StoreError> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM purchases WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(id.as_uuid())
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("find_purchase", e))?;

        row.map(|row| purchase_from_row(&row)).transpose()
    }

    #[instrument(skip(self), fields(user_id = %user_id, page = page.page(), size = page.size()), err)]
    async fn find_completed_by_user(
        &self,
        user_id: UserId,
        page: PageRequest,
    ) -> Result<Page<Purchase>, StoreError> {
        let statuses: Vec<String> = PurchaseStatus::payment_completed()
            .iter()
            .map(|s| s.as_str().to_string())
            .collect();

        let count_row = sqlx::query(
            "SELECT COUNT(*) AS total FROM purchases WHERE user_id = $1 AND status = ANY($2)",
        )
        .bind(user_id.get())
        .bind(&statuses)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("count_purchases", e))?;

        let total: i64 = count_row
            .try_get("total")
            .map_err(|e| StoreError::Corrupt(format!("failed to read count: {e}")))?;

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM purchases \
             WHERE user_id = $1 AND status = ANY($2) \
             ORDER BY created_at {dir}, id {dir} \
             LIMIT $3 OFFSET $4",
            dir = order_keyword(page.sort()),
        );
        let offset = i64::try_from(page.offset()).unwrap_or(i64::MAX);
        let rows = sqlx::query(&sql)
            .bind(user_id.get())
            .bind(&statuses)
            .bind(i64::from(page.size()))
            .bind(offset)
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_purchases", e))?;

        let items = rows
            .iter()
            .map(purchase_from_row)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(items, page, total.max(0) as u64))
    }

    #[instrument(skip(self, purchase), fields(purchase_id = %purchase.id, status = %purchase.status), err)]
    async fn update(&self, purchase: &Purchase) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE purchases
            SET user_id = $2,
                product_id = $3,
                quantity = $4,
                address = $5,
                product_type = $6,
                status = $7,
                created_at = $8,
                updated_at = $9
            WHERE id = $1
            "#,
        )
        .bind(purchase.id.as_uuid())
        .bind(purchase.user_id.get())
        .bind(purchase.product_id.get())
        .bind(quantity_to_db(purchase.quantity)?)
        .bind(&purchase.address)
        .bind(purchase.product_type.as_str())
        .bind(purchase.status.as_str())
        .bind(purchase.created_at)
        .bind(purchase.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_purchase", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Missing(purchase.id));
        }
        Ok(())
    }
}

fn order_keyword(direction: SortDirection) -> &'static str {
    match direction {
        SortDirection::Asc => "ASC",
        SortDirection::Desc => "DESC",
    }
}

fn quantity_to_db(quantity: u32) -> Result<i32, StoreError> {
    i32::try_from(quantity).map_err(|_| StoreError::backend(format!("quantity {quantity} exceeds column range")))
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            StoreError::backend(format!("database error in {}: {}", operation, db_err.message()))
        }
        sqlx::Error::PoolClosed => StoreError::backend(format!("connection pool closed in {operation}")),
        sqlx::Error::ColumnDecode { .. } | sqlx::Error::ColumnNotFound(_) | sqlx::Error::Decode(_) => {
            StoreError::Corrupt(format!("{operation}: {err}"))
        }
        _ => StoreError::backend(format!("sqlx error in {operation}: {err}")),
    }
}

fn purchase_from_row(row: &PgRow) -> Result<Purchase, StoreError> {
    let raw = PurchaseRow::from_row(row).map_err(|e| map_sqlx_error("decode_purchase", e))?;
    Purchase::try_from(raw)
}

// SQLx row type

#[derive(Debug, Clone)]
struct PurchaseRow {
    id: uuid::Uuid,
    user_id: i64,
    product_id: i64,
    quantity: i32,
    address: String,
    product_type: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for PurchaseRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(PurchaseRow {
            id: row.try_get("id")?,
            user_id: row.try_get("user_id")?,
            product_id: row.try_get("product_id")?,
            quantity: row.try_get("quantity")?,
            address: row.try_get("address")?,
            product_type: row.try_get("product_type")?,
            status: row.try_get("status")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl TryFrom<PurchaseRow> for Purchase {
    type Error = StoreError;

    fn try_from(row: PurchaseRow) -> Result<Self, Self::Error> {
        let corrupt = |what: &str, detail: String| {
            StoreError::Corrupt(format!("purchase {}: {what}: {detail}", row.id))
        };

        let quantity = u32::try_from(row.quantity)
            .ok()
            .filter(|q| *q > 0)
            .ok_or_else(|| corrupt("quantity", row.quantity.to_string()))?;
        let product_type = row
            .product_type
            .parse::<ProductType>()
            .map_err(|e| corrupt("product_type", e.to_string()))?;
        let status = row
            .status
            .parse::<PurchaseStatus>()
            .map_err(|e| corrupt("status", e.to_string()))?;

        Ok(Purchase {
            id: PurchaseId::from_uuid(row.id),
            user_id: UserId::new(row.user_id),
            product_id: ProductId::new(row.product_id),
            quantity,
            address: row.address,
            product_type,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> PurchaseRow {
        let at = Utc.with_ymd_and_hms(2025, 1, 2, 3, 4, 5).unwrap();
        PurchaseRow {
            id: uuid::Uuid::now_v7(),
            user_id: 7,
            product_id: 42,
            quantity: 3,
            address: "12 Harbour Rd".to_string(),
            product_type: "reservation_product".to_string(),
            status: "PAYMENT_FAILED".to_string(),
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn row_maps_to_purchase() {
        let raw = row();
        let id = raw.id;

        let purchase = Purchase::try_from(raw).unwrap();

        assert_eq!(purchase.id, PurchaseId::from_uuid(id));
        assert_eq!(purchase.user_id, UserId::new(7));
        assert_eq!(purchase.product_id, ProductId::new(42));
        assert_eq!(purchase.quantity, 3);
        assert_eq!(purchase.product_type, ProductType::ReservationWindow);
        assert_eq!(purchase.status, PurchaseStatus::PaymentFailed);
    }

    #[test]
    fn unknown_enum_values_are_corrupt() {
        let err = Purchase::try_from(PurchaseRow {
            status: "SHIPPED".to_string(),
            ..row()
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref m) if m.contains("status")));

        let err = Purchase::try_from(PurchaseRow {
            product_type: "voucher".to_string(),
            ..row()
        })
        .unwrap_err();
        assert!(matches!(err, StoreError::Corrupt(ref m) if m.contains("product_type")));
    }

    #[test]
    fn non_positive_quantity_is_corrupt() {
        for quantity in [0, -1] {
            let err = Purchase::try_from(PurchaseRow { quantity, ..row() }).unwrap_err();
            assert!(matches!(err, StoreError::Corrupt(_)));
        }
    }

    #[test]
    fn sort_direction_becomes_sql_keyword() {
        assert_eq!(order_keyword(SortDirection::Asc), "ASC");
        assert_eq!(order_keyword(SortDirection::Desc), "DESC");
    }

    #[test]
    fn oversized_quantity_is_refused_before_insert() {
        assert_eq!(quantity_to_db(5), Ok(5));
        assert!(quantity_to_db(u32::MAX).is_err());
    }

    #[test]
    fn schema_creates_the_purchases_table() {
        assert!(CREATE_PURCHASES.contains("CREATE TABLE IF NOT EXISTS purchases"));
    }

    /// Runs against a live database when `TEST_DATABASE_URL` is set.
    #[tokio::test]
    async fn round_trip_against_postgres() {
        let Ok(url) = std::env::var("TEST_DATABASE_URL") else {
            return;
        };
        let store = PgPurchaseStore::connect(&url, 2).await.unwrap();
        store.migrate().await.unwrap();

        let user = UserId::new(i64::from(rand_suffix()));
        let id = store
            .save(NewPurchase {
                user_id: user,
                product_id: ProductId::new(1),
                quantity: 2,
                address: "1 Main St".to_string(),
                product_type: ProductType::DirectSale,
                status: PurchaseStatus::Created,
                created_at: Utc::now(),
            })
            .await
            .unwrap();

        let mut stored = store.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(stored.status, PurchaseStatus::Created);

        let empty = store
            .find_completed_by_user(user, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(empty.total, 0);

        stored.update_status(PurchaseStatus::Active, Utc::now());
        store.update(&stored).await.unwrap();

        let page = store
            .find_completed_by_user(user, PageRequest::default())
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, id);

        let ghost = Purchase {
            id: PurchaseId::new(),
            ..stored
        };
        assert_eq!(store.update(&ghost).await, Err(StoreError::Missing(ghost.id)));
    }

    fn rand_suffix() -> u32 {
        // Low bits of a v7 uuid keep test users apart across runs.
        (uuid::Uuid::now_v7().as_u128() & 0x7fff_ffff) as u32
    }
}
