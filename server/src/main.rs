//! Reservation server binary.

use reserva_core::{Money, Product, ProductId, SystemClock};
use reserva_server::{
    AppState, Config, InMemoryReservationStore, ReservationService, StockLedger, Sweeper,
    build_router,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Seed catalog used until the external catalog CRUD feeds the ledger.
fn demo_catalog() -> Vec<Product> {
    vec![
        Product::new(
            ProductId::new(),
            "Reloj automático Orion".to_string(),
            "Calibre suizo, caja de acero, correa de cuero".to_string(),
            Money::from_cents(45_000_000),
            5,
        ),
        Product::new(
            ProductId::new(),
            "Anillo de plata 925".to_string(),
            "Plata de ley con circonitas engastadas".to_string(),
            Money::from_cents(3_500_000),
            12,
        ),
        Product::new(
            ProductId::new(),
            "Collar de perlas cultivadas".to_string(),
            "Hilo de 45 cm, cierre de oro blanco".to_string(),
            Money::from_cents(18_900_000),
            3,
        ),
    ]
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "reserva_server=info,axum=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting reservation server");

    let config = Config::from_env();
    info!(
        host = %config.server.host,
        port = config.server.port,
        default_hold_minutes = config.reservation.default_hold_minutes,
        sweep_interval_secs = config.reservation.sweep_interval_secs,
        "Configuration loaded"
    );

    let store = Arc::new(InMemoryReservationStore::new());
    let ledger = Arc::new(StockLedger::new(store.clone(), Arc::new(SystemClock)));
    for product in demo_catalog() {
        info!(product = %product.id, name = %product.name, stock = product.stock, "Catalog product registered");
        ledger.register(product);
    }

    let service = Arc::new(ReservationService::new(
        ledger.clone(),
        store,
        config.reservation.policy(),
    ));

    let _sweeper = Sweeper::spawn(
        ledger,
        Duration::from_secs(config.reservation.sweep_interval_secs),
    );

    let router = build_router(AppState { service });

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "Listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if signal::ctrl_c().await.is_ok() {
        info!("Shutdown signal received");
    }
}
