use std::sync::{Arc, Mutex};

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{FixedOffset, TimeZone, Utc};
use ordergate_core::ProductId;
use ordergate_stock::{
    HttpReservationStockClient, HttpStockClient, HttpStockConfig, ReservationStockClient,
    ServiceZone, StockClient, StockError,
};
use serde::Deserialize;
use serde_json::json;

#[derive(Clone, Default)]
struct StubState {
    requests: Arc<Mutex<Vec<String>>>,
}

impl StubState {
    fn record(&self, line: String) {
        self.requests.lock().unwrap().push(line);
    }

    fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[derive(Deserialize)]
struct AdjustParams {
    id: i64,
    quantity: u32,
}

async fn adjust(state: StubState, resource: &str, action: &str, params: AdjustParams) -> StatusCode {
    state.record(format!("PUT {resource}/{action} id={} quantity={}", params.id, params.quantity));
    if params.id == 404 {
        StatusCode::NOT_FOUND
    } else {
        StatusCode::OK
    }
}

async fn stock_decrease(State(s): State<StubState>, Query(p): Query<AdjustParams>) -> StatusCode {
    adjust(s, "stocks", "decrease", p).await
}

async fn stock_increase(State(s): State<StubState>, Query(p): Query<AdjustParams>) -> StatusCode {
    adjust(s, "stocks", "increase", p).await
}

async fn reservation_decrease(
    State(s): State<StubState>,
    Query(p): Query<AdjustParams>,
) -> StatusCode {
    adjust(s, "reservation-stocks", "decrease", p).await
}

async fn reservation_increase(
    State(s): State<StubState>,
    Query(p): Query<AdjustParams>,
) -> StatusCode {
    adjust(s, "reservation-stocks", "increase", p).await
}

async fn stock_remaining(State(s): State<StubState>, Path(id): Path<i64>) -> axum::response::Response {
    s.record(format!("GET stocks/{id}"));
    if id == 13 {
        return (StatusCode::SERVICE_UNAVAILABLE, "maintenance").into_response();
    }
    Json(id * 10).into_response()
}

async fn reservation_snapshot(
    State(s): State<StubState>,
    Path(id): Path<i64>,
) -> axum::response::Response {
    s.record(format!("GET reservation-stocks/{id}"));
    match id {
        500 => (StatusCode::OK, "not json").into_response(),
        0 => Json(json!({ "stock": 2, "reservedAt": null })).into_response(),
        _ => Json(json!({ "stock": 7, "reservedAt": "2030-01-01T09:30:00" })).into_response(),
    }
}

struct StubServer {
    base_url: String,
    state: StubState,
    handle: tokio::task::JoinHandle<()>,
}

impl StubServer {
    async fn spawn() -> Self {
        let state = StubState::default();
        let app = Router::new()
            .route("/api/v1/internal/stocks/decrease", put(stock_decrease))
            .route("/api/v1/internal/stocks/increase", put(stock_increase))
            .route("/api/v1/internal/stocks/:id", get(stock_remaining))
            .route(
                "/api/v1/internal/reservation-stocks/decrease",
                put(reservation_decrease),
            )
            .route(
                "/api/v1/internal/reservation-stocks/increase",
                put(reservation_increase),
            )
            .route(
                "/api/v1/internal/reservation-stocks/:id",
                get(reservation_snapshot),
            )
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind ephemeral port");
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
            handle,
        }
    }

    fn config(&self) -> HttpStockConfig {
        HttpStockConfig::new(self.base_url.clone())
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[tokio::test]
async fn direct_client_reads_remaining_stock() {
    let srv = StubServer::spawn().await;
    let client = HttpStockClient::new(&srv.config()).unwrap();

    let remaining = client.remaining(ProductId::new(4)).await.unwrap();

    assert_eq!(remaining, 40);
    assert_eq!(srv.state.requests(), vec!["GET stocks/4".to_string()]);
}

#[tokio::test]
async fn direct_client_sends_adjustments_as_query_parameters() {
    let srv = StubServer::spawn().await;
    let client = HttpStockClient::new(&srv.config()).unwrap();

    client.decrease(ProductId::new(5), 3).await.unwrap();
    client.increase(ProductId::new(5), 1).await.unwrap();

    assert_eq!(
        srv.state.requests(),
        vec![
            "PUT stocks/decrease id=5 quantity=3".to_string(),
            "PUT stocks/increase id=5 quantity=1".to_string(),
        ]
    );
}

#[tokio::test]
async fn reservation_client_uses_its_own_endpoint() {
    let srv = StubServer::spawn().await;
    let utc = ServiceZone::Fixed(FixedOffset::east_opt(0).unwrap());
    let client = HttpReservationStockClient::new(&srv.config().with_zone(utc)).unwrap();

    let snapshot = client.snapshot(ProductId::new(8)).await.unwrap();
    client.decrease(ProductId::new(8), 2).await.unwrap();

    assert_eq!(snapshot.remaining, 7);
    assert_eq!(
        snapshot.reservation_opens_at,
        Some(Utc.with_ymd_and_hms(2030, 1, 1, 9, 30, 0).unwrap())
    );
    assert_eq!(
        srv.state.requests(),
        vec![
            "GET reservation-stocks/8".to_string(),
            "PUT reservation-stocks/decrease id=8 quantity=2".to_string(),
        ]
    );
}

#[tokio::test]
async fn zoneless_opening_time_is_read_in_the_configured_zone() {
    let srv = StubServer::spawn().await;
    let seoul = ServiceZone::Fixed(FixedOffset::east_opt(9 * 3600).unwrap());
    let client = HttpReservationStockClient::new(&srv.config().with_zone(seoul)).unwrap();

    let snapshot = client.snapshot(ProductId::new(8)).await.unwrap();

    assert_eq!(
        snapshot.reservation_opens_at,
        Some(Utc.with_ymd_and_hms(2030, 1, 1, 0, 30, 0).unwrap())
    );
}

#[tokio::test]
async fn reservation_without_opening_time_has_none() {
    let srv = StubServer::spawn().await;
    let client = HttpReservationStockClient::new(&srv.config()).unwrap();

    let snapshot = client.snapshot(ProductId::new(0)).await.unwrap();

    assert_eq!(snapshot.remaining, 2);
    assert_eq!(snapshot.reservation_opens_at, None);
    assert_eq!(client.remaining(ProductId::new(0)).await.unwrap(), 2);
}

#[tokio::test]
async fn error_status_is_surfaced_with_body() {
    let srv = StubServer::spawn().await;
    let client = HttpStockClient::new(&srv.config()).unwrap();

    let err = client.remaining(ProductId::new(13)).await.unwrap_err();
    assert_eq!(
        err,
        StockError::Status {
            status: 503,
            body: "maintenance".to_string()
        }
    );

    let err = client.decrease(ProductId::new(404), 1).await.unwrap_err();
    assert!(matches!(err, StockError::Status { status: 404, .. }));
}

#[tokio::test]
async fn undecodable_body_is_a_decode_error() {
    let srv = StubServer::spawn().await;
    let client = HttpReservationStockClient::new(&srv.config()).unwrap();

    let err = client.snapshot(ProductId::new(500)).await.unwrap_err();

    assert!(matches!(err, StockError::Decode(_)), "got {err:?}");
}

#[tokio::test]
async fn unreachable_service_is_a_transport_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let client = HttpStockClient::new(&HttpStockConfig::new(format!("http://{addr}"))).unwrap();

    let err = client.remaining(ProductId::new(1)).await.unwrap_err();

    assert!(matches!(err, StockError::Transport(_)), "got {err:?}");
}
