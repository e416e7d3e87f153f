use std::sync::{Arc, Mutex};
use std::time::Duration;

use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use booking_engine::config::AppConfig;
use booking_engine::db;
use booking_engine::handlers;
use booking_engine::services::autosave::spawn_autosave;
use booking_engine::services::clock::{SystemClock, UuidGenerator};
use booking_engine::services::lifecycle::{Collaborators, EngineContext};
use booking_engine::services::notifications::webhook::WebhookNotifier;
use booking_engine::services::notifications::{LogNotifier, Notifier};
use booking_engine::services::payment::http::HttpPaymentGateway;
use booking_engine::services::payment::{PaymentGateway, UnconfiguredGateway};
use booking_engine::services::registry::BookingRegistry;
use booking_engine::services::scheduling::SqliteAppointmentRepository;
use booking_engine::services::store::SqliteStore;
use booking_engine::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = AppConfig::from_env();

    let conn = Arc::new(Mutex::new(db::init_db(&config.database_url)?));

    let gateway: Arc<dyn PaymentGateway> = if config.payment_gateway_url.is_empty() {
        tracing::warn!("PAYMENT_GATEWAY_URL not set, payments will be declined");
        Arc::new(UnconfiguredGateway)
    } else {
        tracing::info!("using HTTP payment gateway (url: {})", config.payment_gateway_url);
        Arc::new(HttpPaymentGateway::new(
            config.payment_gateway_url.clone(),
            config.payment_gateway_key.clone(),
        ))
    };

    let notifier: Arc<dyn Notifier> = if config.notification_webhook_url.is_empty() {
        tracing::warn!("NOTIFICATION_WEBHOOK_URL not set, confirmations go to the log only");
        Arc::new(LogNotifier)
    } else {
        Arc::new(WebhookNotifier::new(config.notification_webhook_url.clone()))
    };

    let engine = Arc::new(EngineContext::new(
        Collaborators {
            store: Arc::new(SqliteStore::new(Arc::clone(&conn))),
            gateway,
            appointments: Arc::new(SqliteAppointmentRepository::new(Arc::clone(&conn))),
            notifier,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
        },
        Duration::from_secs(config.gateway_timeout_secs),
        &config.default_currency,
    ));

    let bookings = Arc::new(BookingRegistry::new());
    bookings.restore(&engine).await?;

    let _autosave = spawn_autosave(
        Arc::clone(&bookings),
        Duration::from_secs(config.autosave_interval_secs.max(1)),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        engine,
        bookings,
    });

    let app = handlers::router(state).layer(TraceLayer::new_for_http());

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("starting server on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
