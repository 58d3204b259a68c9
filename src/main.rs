//! eventhive-api server entry point.
//!
//! Loads configuration, wires the selected collaborators and starts the
//! Axum HTTP server.

use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::EnvFilter;

use eventhive_api::api;
use eventhive_api::api::auth::{HeaderIdentity, IdentityProvider, StubIdentity};
use eventhive_api::app_state::AppState;
use eventhive_api::config::{AppConfig, AuthMode, GatewayKind, LogFormat, StorageBackend};
use eventhive_api::domain::Requester;
use eventhive_api::gateway::{PaymentGateway, RazorpayGateway, StubGateway};
use eventhive_api::persistence::{
    BookingStore, EventStore, MemoryBookingStore, MemoryEventStore, PostgresStore,
};
use eventhive_api::service::PaymentSettings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = AppConfig::from_env().context("loading configuration")?;
    init_tracing(config.log_format);
    tracing::info!(
        addr = %config.listen_addr,
        storage = ?config.storage_backend,
        gateway = ?config.payment_gateway,
        auth = ?config.auth_mode,
        "starting eventhive-api"
    );

    // Build collaborators
    let (events, bookings) = build_storage(&config).await?;
    let gateway = build_gateway(&config);
    let identity = build_identity(&config);

    // Build application state
    let payment_settings = PaymentSettings {
        gateway_secret: config.razorpay_key_secret.clone(),
        ticket_secret: config.ticket_secret.clone(),
        currency: config.payment_currency.clone(),
        gateway_timeout: config.gateway_timeout,
    };
    let app_state = AppState::new(events, bookings, gateway, payment_settings, identity);

    // Build router
    let app = api::build_app(app_state, config.request_timeout);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    match format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

async fn build_storage(
    config: &AppConfig,
) -> anyhow::Result<(Arc<dyn EventStore>, Arc<dyn BookingStore>)> {
    match config.storage_backend {
        StorageBackend::Memory => {
            tracing::warn!("using in-memory storage; data is lost on restart");
            Ok((
                Arc::new(MemoryEventStore::new()),
                Arc::new(MemoryBookingStore::new()),
            ))
        }
        StorageBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("DATABASE_URL is not set")?;
            let store = PostgresStore::connect(
                url,
                config.database_max_connections,
                config.database_min_connections,
                std::time::Duration::from_secs(config.database_connect_timeout_secs),
            )
            .await
            .context("connecting to PostgreSQL")?;
            tracing::info!("connected to PostgreSQL, migrations applied");
            let store = Arc::new(store);
            Ok((
                Arc::clone(&store) as Arc<dyn EventStore>,
                store as Arc<dyn BookingStore>,
            ))
        }
    }
}

fn build_gateway(config: &AppConfig) -> Arc<dyn PaymentGateway> {
    match config.payment_gateway {
        GatewayKind::Razorpay => Arc::new(RazorpayGateway::new(
            config.razorpay_base_url.clone(),
            config.razorpay_key_id.clone(),
            config.razorpay_key_secret.clone(),
            config.gateway_timeout,
        )),
        GatewayKind::Stub => {
            tracing::warn!(behavior = ?config.stub_gateway_behavior, "using stub payment gateway");
            Arc::new(StubGateway::new(
                config.razorpay_key_id.clone(),
                config.stub_gateway_behavior,
            ))
        }
    }
}

fn build_identity(config: &AppConfig) -> Arc<dyn IdentityProvider> {
    match config.auth_mode {
        AuthMode::Headers => Arc::new(HeaderIdentity),
        AuthMode::Stub => {
            tracing::warn!(
                user_id = %config.stub_user_id,
                role = ?config.stub_user_role,
                "using stub identity; every request acts as this user"
            );
            Arc::new(StubIdentity::new(Requester::new(
                config.stub_user_id,
                config.stub_user_role,
            )))
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
