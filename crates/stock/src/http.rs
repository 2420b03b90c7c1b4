//! HTTP transport to the stock service's internal API.
//!
//! ```text
//! PUT {base}/api/v1/internal/stocks/decrease?id={productId}&quantity={n}
//! PUT {base}/api/v1/internal/stocks/increase?id={productId}&quantity={n}
//! GET {base}/api/v1/internal/stocks/{productId}                 -> 17
//! ```
//!
//! Reservation-window products use the same shape under
//! `/api/v1/internal/reservation-stocks`, and their GET answers
//! `{"stock": 17, "reservedAt": "2024-05-01T10:00:00"}`. A `reservedAt`
//! without an offset is wall-clock time in the stock service's zone
//! ([`ServiceZone`]).

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone, Utc};
use ordergate_core::ProductId;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::client::{ReservationStockClient, StockClient};
use crate::error::StockError;
use crate::snapshot::StockSnapshot;

const DIRECT_RESOURCE: &str = "api/v1/internal/stocks";
const RESERVATION_RESOURCE: &str = "api/v1/internal/reservation-stocks";

/// Zone in which the stock service writes zone-less timestamps.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ServiceZone {
    /// Same zone as this process (`TZ` or the system setting).
    #[default]
    Local,
    Fixed(FixedOffset),
}

impl ServiceZone {
    /// Place a wall-clock time on the UTC timeline.
    ///
    /// `None` for a local time skipped by a DST gap. In a DST fold the earlier
    /// instant wins.
    pub fn resolve(self, naive: NaiveDateTime) -> Option<DateTime<Utc>> {
        match self {
            ServiceZone::Local => Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|at| at.with_timezone(&Utc)),
            ServiceZone::Fixed(offset) => offset
                .from_local_datetime(&naive)
                .single()
                .map(|at| at.with_timezone(&Utc)),
        }
    }
}

/// Where an endpoint lives, how long a single request may take, and the
/// zone of its zone-less timestamps.
///
/// No timeout means the transport default applies.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpStockConfig {
    pub base_url: String,
    pub timeout: Option<Duration>,
    pub zone: ServiceZone,
}

impl HttpStockConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: None,
            zone: ServiceZone::default(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_zone(mut self, zone: ServiceZone) -> Self {
        self.zone = zone;
        self
    }
}

/// Direct-sale stock endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpStockClient {
    http: reqwest::Client,
    base_url: String,
    resource: &'static str,
    zone: ServiceZone,
}

impl HttpStockClient {
    pub fn new(config: &HttpStockConfig) -> Result<Self, StockError> {
        Self::build(config, DIRECT_RESOURCE)
    }

    fn build(config: &HttpStockConfig, resource: &'static str) -> Result<Self, StockError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| StockError::transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            resource,
            zone: config.zone,
        })
    }

    fn url(&self, tail: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.resource, tail)
    }

    async fn adjust(&self, action: &str, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        let url = self.url(action);
        let resp = self
            .http
            .put(&url)
            .query(&[
                ("id", product_id.to_string()),
                ("quantity", quantity.to_string()),
            ])
            .send()
            .await
            .map_err(|e| StockError::transport(e.to_string()))?;

        ensure_success(&url, resp).await?;
        Ok(())
    }

    async fn read<T: DeserializeOwned>(&self, product_id: ProductId) -> Result<T, StockError> {
        let url = self.url(&product_id.to_string());
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| StockError::transport(e.to_string()))?;

        let resp = ensure_success(&url, resp).await?;
        resp.json::<T>()
            .await
            .map_err(|e| StockError::decode(e.to_string()))
    }
}

async fn ensure_success(url: &str, resp: reqwest::Response) -> Result<reqwest::Response, StockError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }

    let body = resp.text().await.unwrap_or_default();
    tracing::warn!(%url, status = status.as_u16(), "stock service call failed");
    Err(StockError::Status {
        status: status.as_u16(),
        body,
    })
}

#[async_trait]
impl StockClient for HttpStockClient {
    async fn decrease(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        self.adjust("decrease", product_id, quantity).await
    }

    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        self.adjust("increase", product_id, quantity).await
    }

    async fn remaining(&self, product_id: ProductId) -> Result<i64, StockError> {
        self.read::<i64>(product_id).await
    }
}

/// Reservation-window stock endpoint over HTTP.
#[derive(Debug, Clone)]
pub struct HttpReservationStockClient {
    inner: HttpStockClient,
}

impl HttpReservationStockClient {
    pub fn new(config: &HttpStockConfig) -> Result<Self, StockError> {
        Ok(Self {
            inner: HttpStockClient::build(config, RESERVATION_RESOURCE)?,
        })
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ReservationStockResponse {
    stock: i64,
    #[serde(default)]
    reserved_at: Option<String>,
}

/// Accepts RFC 3339, or a zone-less date-time read in the service's zone.
fn parse_opens_at(raw: &str, zone: ServiceZone) -> Result<DateTime<Utc>, StockError> {
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(at.with_timezone(&Utc));
    }

    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map_err(|e| StockError::decode(format!("invalid reservedAt '{raw}': {e}")))?;
    zone.resolve(naive)
        .ok_or_else(|| StockError::decode(format!("reservedAt '{raw}' does not exist in {zone:?}")))
}

#[async_trait]
impl StockClient for HttpReservationStockClient {
    async fn decrease(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        self.inner.decrease(product_id, quantity).await
    }

    async fn increase(&self, product_id: ProductId, quantity: u32) -> Result<(), StockError> {
        self.inner.increase(product_id, quantity).await
    }

    async fn remaining(&self, product_id: ProductId) -> Result<i64, StockError> {
        Ok(self.snapshot(product_id).await?.remaining)
    }
}

#[async_trait]
impl ReservationStockClient for HttpReservationStockClient {
    async fn snapshot(&self, product_id: ProductId) -> Result<StockSnapshot, StockError> {
        let body: ReservationStockResponse = self.inner.read(product_id).await?;
        let opens_at = body
            .reserved_at
            .as_deref()
            .map(|raw| parse_opens_at(raw, self.inner.zone))
            .transpose()?;
        Ok(StockSnapshot::reservation(body.stock, opens_at))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as TimeDelta;

    fn seoul() -> ServiceZone {
        ServiceZone::Fixed(FixedOffset::east_opt(9 * 3600).unwrap())
    }

    fn utc() -> ServiceZone {
        ServiceZone::Fixed(FixedOffset::east_opt(0).unwrap())
    }

    #[test]
    fn zoneless_timestamp_is_read_in_the_service_zone() {
        let at = parse_opens_at("2024-05-01T10:00:00", seoul()).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 5, 1, 1, 0, 0).unwrap());

        let at = parse_opens_at("2024-05-01T10:00:00.250", utc()).unwrap();
        assert_eq!(
            at,
            Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap() + TimeDelta::milliseconds(250)
        );
    }

    #[test]
    fn window_opened_an_hour_ago_east_of_utc_is_open() {
        let now = Utc::now();
        let offset = FixedOffset::east_opt(9 * 3600).unwrap();
        let an_hour_ago_in_seoul = (now - TimeDelta::hours(1)).with_timezone(&offset).naive_local();
        let raw = an_hour_ago_in_seoul.format("%Y-%m-%dT%H:%M:%S").to_string();

        let opens_at = parse_opens_at(&raw, seoul()).unwrap();
        let snapshot = StockSnapshot::reservation(5, Some(opens_at));

        assert!(opens_at < now);
        assert!(snapshot.is_open_at(now));
    }

    #[test]
    fn local_zone_follows_the_process_zone() {
        let naive = NaiveDateTime::parse_from_str("2024-05-01T10:00:00", "%Y-%m-%dT%H:%M:%S").unwrap();
        let expected = Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|at| at.with_timezone(&Utc));

        assert_eq!(ServiceZone::Local.resolve(naive), expected);
        assert_eq!(HttpStockConfig::new("http://stock").zone, ServiceZone::Local);
    }

    #[test]
    fn offset_timestamps_ignore_the_service_zone() {
        let at = parse_opens_at("2024-05-01T12:00:00+02:00", seoul()).unwrap();
        assert_eq!(at, Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap());
    }

    #[test]
    fn reservation_body_without_timestamp_is_open() {
        let null: ReservationStockResponse =
            serde_json::from_str(r#"{"stock": 3, "reservedAt": null}"#).unwrap();
        assert_eq!(null.reserved_at, None);

        let missing: ReservationStockResponse = serde_json::from_str(r#"{"stock": 0}"#).unwrap();
        assert_eq!(missing.stock, 0);
        assert_eq!(missing.reserved_at, None);
    }

    #[test]
    fn garbage_timestamp_is_a_decode_error() {
        let err = parse_opens_at("soon", utc()).unwrap_err();
        assert!(matches!(err, StockError::Decode(_)));
    }

    #[test]
    fn trailing_slash_in_base_url_is_ignored() {
        let client = HttpStockClient::new(&HttpStockConfig::new("http://stock.local/")).unwrap();
        assert_eq!(
            client.url("decrease"),
            "http://stock.local/api/v1/internal/stocks/decrease"
        );
    }
}
