//! Dispatcher composition root.
//!
//! Wires the store gateway (C1), cache/command-bus gateway (C2), the
//! delivery and retry services (C3/C4), their schedulers (C5/C6), the
//! command listener (C7), and the readiness probe (C8) into a running
//! service, then serves `/ready`, `/live`, `/metrics` alongside it.

mod config;
mod http;

use std::sync::Arc;

use core_config::{Environment, FromEnv};
use database::postgres::{connect_from_config_with_retry as connect_postgres, PostgresConfig};
use database::redis::{
    connect_from_config_with_retry as connect_redis, Client as RedisClient, RedisConfig,
};
use domain_dispatch::{
    DeliveryService, PgStoreGateway, ReadinessProbe, RedisCacheGateway, RedisCommandSource,
    ReqwestWebhookClient, RetryService,
};
use eyre::{Result, WrapErr};
use scheduler::{CommandListener, Controllable, Scheduler};
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::watch;
use tracing::{error, info};

use crate::config::DispatcherConfig;

const COMMAND_CHANNEL: &str = "scheduler:commands";

pub async fn run() -> Result<()> {
    color_eyre::install().ok();

    let environment = Environment::from_env();
    core_config::tracing::init_tracing(&environment);
    observability::init_metrics();

    info!(?environment, "starting dispatcher");

    let config = DispatcherConfig::from_env().wrap_err("failed to load dispatcher configuration")?;

    let pg_config = PostgresConfig::from_env().wrap_err("failed to load database configuration")?;
    info!("connecting to postgres...");
    let db = connect_postgres(pg_config, None)
        .await
        .wrap_err("failed to connect to postgres")?;

    database::postgres::run_migrations::<migration::Migrator>(&db, "dispatcher")
        .await
        .wrap_err("failed to run migrations")?;

    let redis_config = RedisConfig::from_env().wrap_err("failed to load redis configuration")?;
    info!("connecting to redis...");
    let redis_manager = connect_redis(redis_config.clone(), None)
        .await
        .wrap_err("failed to connect to redis")?;
    let redis_client = RedisClient::open(redis_config.url).wrap_err("failed to open redis pubsub client")?;

    let store = Arc::new(PgStoreGateway::new(db.clone()));
    let cache = Arc::new(RedisCacheGateway::new(redis_manager, redis_client));
    let webhook = Arc::new(
        ReqwestWebhookClient::new(config.webhook_url.clone(), config.http_timeout)
            .wrap_err("failed to build webhook client")?,
    );

    let delivery = Arc::new(DeliveryService::new(
        db.clone(),
        store.clone(),
        cache.clone(),
        webhook.clone(),
        config.batch_size,
        config.max_concurrent,
    ));
    let retry = Arc::new(RetryService::new(
        db.clone(),
        store.clone(),
        webhook.clone(),
        config.batch_size,
        config.max_retry_concurrent,
    ));
    let readiness = Arc::new(ReadinessProbe::new(store.clone(), cache.clone()));

    let delivery_scheduler = Arc::new(Scheduler::new("delivery", config.scheduler_interval, config.scheduler_enabled, {
        let delivery = delivery.clone();
        move || {
            let delivery = delivery.clone();
            async move { delivery.drain().await }
        }
    }));
    let retry_scheduler = Arc::new(Scheduler::new("retry", config.scheduler_interval, config.scheduler_enabled, {
        let retry = retry.clone();
        move || {
            let retry = retry.clone();
            async move { retry.drain().await }
        }
    }));

    delivery_scheduler.start().await;
    retry_scheduler.start().await;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let command_targets: Vec<Arc<dyn Controllable>> = vec![delivery_scheduler.clone(), retry_scheduler.clone()];
    let listener = CommandListener::new(command_targets);
    let command_source = RedisCommandSource::new(
        cache
            .subscribe(COMMAND_CHANNEL)
            .await
            .wrap_err("failed to subscribe to the scheduler command channel")?,
    );
    let command_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        listener.listen(command_source, command_shutdown).await;
    });

    let http_router = http::router(readiness);
    let server_config = core_config::server::ServerConfig::from_env().unwrap_or_default();
    let listener_addr = server_config.address();
    let tcp_listener = TcpListener::bind(&listener_addr)
        .await
        .wrap_err_with(|| format!("failed to bind health listener to {listener_addr}"))?;
    info!(address = %listener_addr, "health/metrics listener bound");
    let mut http_shutdown = shutdown_rx.clone();
    tokio::spawn(async move {
        let serve = axum::serve(tcp_listener, http_router).with_graceful_shutdown(async move {
            let _ = http_shutdown.changed().await;
        });
        if let Err(e) = serve.await {
            error!(error = %e, "health/metrics server failed");
        }
    });

    tokio::spawn(async move {
        if let Err(e) = shutdown_signal().await {
            error!(error = %e, "error waiting for shutdown signal");
        }
        let _ = shutdown_tx.send(true);
    });

    let mut wait_for_shutdown = shutdown_rx;
    let _ = wait_for_shutdown.changed().await;
    info!("shutdown requested, stopping schedulers");
    delivery_scheduler.stop().await;
    retry_scheduler.stop().await;
    tokio::time::sleep(config.shutdown_timeout).await;

    info!("dispatcher stopped");
    Ok(())
}

async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async {
        signal::ctrl_c().await.expect("failed to install ctrl-c handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install sigterm handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("received ctrl-c, initiating shutdown"),
        _ = terminate => info!("received sigterm, initiating shutdown"),
    }

    Ok(())
}
