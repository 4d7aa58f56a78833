//! One scheduled charge run against PostgreSQL.
//!
//! The external scheduler starts this binary; it charges every due
//! recurrent payment once and exits. Exit code 2 means at least one record
//! failed with an error and was left for the next run.

use std::process::ExitCode;
use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::EnvFilter;

use crm_payments::adapters::postgres::{
    PostgresPaymentGatewayReader, PostgresPaymentLogRepository, PostgresPaymentRepository, PostgresRecurrentPaymentRepository,
    PostgresSubscriptionTypeReader,
};
use crm_payments::adapters::{
    InMemoryEventBus, LoggingEventHandler, MockGatewayClient, StaticGatewayRegistry,
    SubscriptionLengthCalculator,
};
use crm_payments::application::{ChargeRecurrentPaymentsCommand, ChargeRecurrentPaymentsHandler};
use crm_payments::config::{AppConfig, GatewayDriver, GatewaysConfig, LogFormat, LoggingConfig};
use crm_payments::domain::foundation::Timestamp;
use crm_payments::ports::{EventSubscriber, PaymentGatewayReader};

const LOGGED_EVENT_TYPES: &[&str] = &[
    "recurrent_payment.charged.v1",
    "recurrent_payment.pending.v1",
    "recurrent_payment.charge_failed.v1",
    "recurrent_payment.stopped.v1",
    "recurrent_payment.scheduled.v1",
];

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.logging);
    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;

    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("Migrations applied");
    }

    let settings = config.charging.snapshot();

    let mut registry = build_registry(&config.gateways);
    let gateways = PostgresPaymentGatewayReader::new(pool.clone()).find_all().await?;
    for code in registry.retain_recurrent(&gateways) {
        tracing::warn!(gateway = %code, "Gateway not active for recurring charges, skipping its records");
    }

    let event_bus = Arc::new(InMemoryEventBus::new());
    event_bus.subscribe_all(LOGGED_EVENT_TYPES, Arc::new(LoggingEventHandler));

    let handler = ChargeRecurrentPaymentsHandler::new(
        Arc::new(PostgresRecurrentPaymentRepository::new(pool.clone())),
        Arc::new(PostgresPaymentRepository::new(pool.clone())),
        Arc::new(PostgresSubscriptionTypeReader::new(pool.clone())),
        Arc::new(registry),
        Arc::new(PostgresPaymentLogRepository::new(pool.clone())),
        Arc::new(SubscriptionLengthCalculator::new(settings.charge_lead_time)),
        event_bus,
    );

    let summary = handler
        .handle(ChargeRecurrentPaymentsCommand {
            now: Timestamp::now(),
            settings,
        })
        .await?;

    pool.close().await;

    if summary.errors > 0 {
        tracing::warn!(errors = summary.errors, "Charge run finished with errors");
        return Ok(ExitCode::from(2));
    }
    Ok(ExitCode::SUCCESS)
}

fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format {
        LogFormat::Json => subscriber.json().init(),
        LogFormat::Pretty => subscriber.init(),
    }
}

fn build_registry(gateways: &GatewaysConfig) -> StaticGatewayRegistry {
    let mut registry = StaticGatewayRegistry::new();
    for (code, gateway) in gateways.entries() {
        match gateway.driver {
            GatewayDriver::Mock => {
                tracing::warn!(gateway = code, "Using mock gateway client, charges are approved without moving money");
                registry.register(Arc::new(MockGatewayClient::new(code)));
            }
        }
    }
    registry
}
