//! Storefront Orders - order placement and payment reconciliation service

use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use storefront_orders::api::{self, AppState};
use storefront_orders::config::Config;
use storefront_orders::notify::{LogNotifier, NatsNotifier, Notifier};
use storefront_orders::payment::HttpPaymentGateway;
use storefront_orders::store::{MemoryStore, PgStore, Store};
use storefront_orders::OrderService;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!(e))?;

    let store: Arc<dyn Store> = match &config.database_url {
        Some(url) => {
            let db = PgPoolOptions::new().max_connections(10).connect(url).await?;
            sqlx::migrate!("./migrations").run(&db).await?;
            Arc::new(PgStore::new(db))
        }
        None => {
            tracing::warn!("DATABASE_URL not set, using in-memory store (data is lost on restart)");
            Arc::new(MemoryStore::new())
        }
    };

    let notifier: Arc<dyn Notifier> = match &config.nats_url {
        Some(url) => match async_nats::connect(url.as_str()).await {
            Ok(client) => Arc::new(NatsNotifier::new(client)),
            Err(e) => {
                tracing::warn!(error = %e, "NATS unavailable, logging order events instead");
                Arc::new(LogNotifier)
            }
        },
        None => Arc::new(LogNotifier),
    };

    let gateway = HttpPaymentGateway::new(
        &config.payment_api_base,
        &config.payment_key_id,
        &config.payment_key_secret,
        config.tx_timeout,
    )?;

    let orders = OrderService::new(store, Arc::new(gateway), notifier, config.order_settings());
    let state = AppState { orders: Arc::new(orders), jwt_secret: config.jwt_secret.clone() };
    let app = api::router(state);

    tracing::info!(environment = %config.environment, "Storefront orders listening on 0.0.0.0:{}", config.port);
    axum::serve(tokio::net::TcpListener::bind(format!("0.0.0.0:{}", config.port)).await?, app).await?;
    Ok(())
}
