//! Plan Billing server.
//!
//! Wires configuration, logging, PostgreSQL, the gateway client, the event
//! publisher and the reconciliation scheduler, then serves the billing API
//! until interrupted.

use std::sync::Arc;

use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use plan_billing::adapters::events::{InMemoryEventBus, RedisEventPublisher};
use plan_billing::adapters::gateway::{HttpGatewayConfig, HttpPaymentGateway};
use plan_billing::adapters::http::{billing_app, BillingAppState, BillingPorts};
use plan_billing::adapters::postgres::{
    PostgresPaymentRepository, PostgresPlanRepository, PostgresWebhookEventRepository,
};
use plan_billing::application::handlers::billing::{
    ChargeSettings, ReconciliationScheduler, ReconciliationSchedulerConfig,
};
use plan_billing::config::{AppConfig, ServerConfig};
use plan_billing::domain::billing::EventDeduplicator;
use plan_billing::ports::EventPublisher;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    let pool = PgPoolOptions::new()
        .min_connections(config.database.min_connections)
        .max_connections(config.database.max_connections)
        .acquire_timeout(config.database.acquire_timeout())
        .connect(&config.database.url)
        .await?;
    if config.database.run_migrations {
        sqlx::migrate!("./migrations").run(&pool).await?;
        info!("Database migrations applied");
    }

    let publisher: Arc<dyn EventPublisher> = if config.redis.is_configured() {
        let client = redis::Client::open(config.redis.url.as_str())?;
        let conn = client.get_multiplexed_async_connection().await?;
        info!(channel = %config.redis.channel, "Publishing approved events to Redis");
        Arc::new(RedisEventPublisher::with_channel(conn, config.redis.channel.clone()))
    } else {
        warn!("Redis not configured, approved events stay in process");
        Arc::new(InMemoryEventBus::new())
    };

    let ports = BillingPorts {
        payments: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        plans: Arc::new(PostgresPlanRepository::new(pool.clone())),
        webhook_events: Arc::new(PostgresWebhookEventRepository::new(pool)),
        gateway: Arc::new(HttpPaymentGateway::new(HttpGatewayConfig::from(&config.gateway))?),
        publisher,
    };
    let settings = ChargeSettings {
        statement_descriptor: config.gateway.statement_descriptor.clone(),
        default_description: config.gateway.default_description.clone(),
    };
    let state = BillingAppState::new(ports.clone(), &config.gateway.webhook_secret, settings);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler_task = if config.scheduler.enabled {
        let mut scheduler_config = ReconciliationSchedulerConfig::default()
            .with_interval(config.scheduler.interval())
            .with_statuses(config.scheduler.sweep_statuses()?);
        if config.scheduler.webhook_retention_days > 0 {
            scheduler_config = scheduler_config
                .with_webhook_retention(chrono::Duration::days(config.scheduler.webhook_retention_days));
        }
        let scheduler =
            ReconciliationScheduler::with_config(ports.gateway.clone(), state.ledger.clone(), scheduler_config)
                .with_deduplicator(EventDeduplicator::new(ports.webhook_events.clone()));
        Some(tokio::spawn(async move { scheduler.run(shutdown_rx).await }))
    } else {
        info!("Reconciliation scheduler disabled");
        None
    };

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, environment = ?config.server.environment, "Billing server listening");

    axum::serve(listener, billing_app(state, config.server.request_timeout()))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Some(task) = scheduler_task {
        task.await?;
    }
    info!("Billing server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(server.log_level.clone()));
    let result = if server.log_json {
        fmt().with_env_filter(filter).json().try_init()
    } else {
        fmt().with_env_filter(filter).try_init()
    };
    if let Err(e) = result {
        eprintln!("tracing already initialised: {}", e);
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
