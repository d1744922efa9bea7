//! HTTP client against the real server router.
//!
//! Exercises `HttpReservationApi` end to end: the server side is the actual
//! axum router on an ephemeral port, not a stub, so these tests pin the wire
//! contract between the two crates.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use reserva_client::{ClientError, HttpReservationApi, ReservationBackend};
use reserva_core::{Money, Product, ProductId, ReservationStatus, SystemClock};
use reserva_server::{
    AppState, InMemoryReservationStore, ReservationPolicy, ReservationService, StockLedger,
    build_router,
};
use std::sync::Arc;
use uuid::Uuid;

async fn spawn_server(stock: u32) -> (HttpReservationApi, ProductId) {
    let store = Arc::new(InMemoryReservationStore::new());
    let ledger = Arc::new(StockLedger::new(store.clone(), Arc::new(SystemClock)));
    let product_id = ProductId::new();
    ledger.register(Product::new(
        product_id,
        "Pulsera de oro 18k".to_string(),
        "Eslabones macizos, cierre de mosquetón".to_string(),
        Money::from_cents(62_000_000),
        stock,
    ));
    let service = Arc::new(ReservationService::new(
        ledger,
        store,
        ReservationPolicy::default(),
    ));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind ephemeral port");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, build_router(AppState { service }))
            .await
            .unwrap();
    });

    (HttpReservationApi::new(format!("http://{addr}")), product_id)
}

fn token() -> String {
    Uuid::new_v4().to_string()
}

#[tokio::test]
async fn full_hold_lifecycle_over_the_wire() {
    let (api, product_id) = spawn_server(5).await;
    let user = token();

    assert_eq!(api.stock(product_id).await.unwrap().stock_disponible, 5);

    let reservation = api.reserve(&user, product_id, 2, Some(30)).await.unwrap();
    assert_eq!(reservation.quantity, 2);
    assert!(reservation.status.is_active());
    assert_eq!(api.stock(product_id).await.unwrap().stock_disponible, 3);

    let active = api.active(&user).await.unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].id, reservation.id);

    let status = api.confirm(&user, reservation.id).await.unwrap();
    assert_eq!(status, ReservationStatus::Confirmed);
    assert_eq!(api.stock(product_id).await.unwrap().stock_disponible, 3);
    assert!(api.active(&user).await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_restores_stock_over_the_wire() {
    let (api, product_id) = spawn_server(4).await;
    let user = token();

    let reservation = api.reserve(&user, product_id, 3, None).await.unwrap();
    assert_eq!(api.stock(product_id).await.unwrap().stock_disponible, 1);

    let status = api.cancel(&user, reservation.id).await.unwrap();
    assert_eq!(status, ReservationStatus::Cancelled);
    assert_eq!(api.stock(product_id).await.unwrap().stock_disponible, 4);
}

#[tokio::test]
async fn server_rejections_decode_into_typed_errors() {
    let (api, product_id) = spawn_server(2).await;
    let user = token();

    let err = api.reserve(&user, product_id, 3, None).await.unwrap_err();
    match err {
        ClientError::Api { status, code, .. } => {
            assert_eq!(status, 409);
            assert_eq!(code, "INSUFFICIENT_STOCK");
        }
        other => panic!("expected Api error, got {other}"),
    }

    let reservation = api.reserve(&user, product_id, 2, None).await.unwrap();
    let intruder = token();
    let err = api.confirm(&intruder, reservation.id).await.unwrap_err();
    assert_eq!(err.code(), Some("FORBIDDEN"));

    api.cancel(&user, reservation.id).await.unwrap();
    let err = api.cancel(&user, reservation.id).await.unwrap_err();
    assert_eq!(err.code(), Some("INVALID_TRANSITION"));
}
