//! Receiver entry-point: wires the coordination layer and the probe listener.

mod server;

use std::io;
use std::sync::Arc;

use actix_web::web;
use ortho_config::OrthoConfig;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use server::create_server;
use webhook_receiver::domain::{
    LeaderElector, RegistrationOrchestrator, SchemaInitializer, SubscriptionReconciler,
    TokioSleeper,
};
use webhook_receiver::inbound::http::health::{HealthState, LeaderState};
use webhook_receiver::outbound::persistence::{
    DbPool, DieselCoordinationStore, DieselSubscriptionMappingRepository, PoolConfig,
    PostgresSchemaProvisioner,
};
use webhook_receiver::outbound::registry::HttpSubscriptionRegistry;
use webhook_receiver::settings::{RuntimeConfig, WebhookSettings};

/// Application bootstrap.
#[actix_web::main]
async fn main() -> io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let settings = WebhookSettings::load()
        .map_err(|e| io::Error::other(format!("failed to load configuration: {e}")))?;
    let config = settings.resolve().map_err(io::Error::other)?;

    let orchestrator = Arc::new(build_orchestrator(&config).await?);
    let elector = orchestrator.elector();
    info!(
        instance_id = %elector.instance_id(),
        app_name = %elector.app_name(),
        bind_addr = %config.bind_addr,
        "starting webhook receiver"
    );

    let health_state = web::Data::new(HealthState::new());
    let leader_state = web::Data::new(LeaderState::new(
        elector.instance_id(),
        elector.app_name().clone(),
        elector.leadership(),
    ));
    let server = create_server(health_state.clone(), leader_state, config.bind_addr)?;
    let server_handle = server.handle();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let coordination = actix_web::rt::spawn(async move {
        let outcome = orchestrator.run(shutdown_rx).await;
        if let Err(err) = &outcome {
            error!(error = %err, "coordination failed; stopping server");
            server_handle.stop(true).await;
        }
        outcome
    });

    let served = server.await;
    health_state.mark_unhealthy();
    shutdown_tx.send_replace(true);

    let coordinated = coordination
        .await
        .map_err(|e| io::Error::other(format!("coordination task failed: {e}")))?;
    served?;
    coordinated.map_err(io::Error::other)
}

async fn build_orchestrator(config: &RuntimeConfig) -> io::Result<RegistrationOrchestrator> {
    let pool = DbPool::new(
        PoolConfig::new(config.database_url.as_str()).with_max_size(config.db_pool_max_size),
    )
    .await
    .map_err(io::Error::other)?;
    let provisioner =
        PostgresSchemaProvisioner::new(config.database_url.as_str()).map_err(io::Error::other)?;
    let registry =
        HttpSubscriptionRegistry::new(config.registry_url.clone(), config.registry_timeout)
            .map_err(io::Error::other)?;

    let elector = Arc::new(LeaderElector::new(
        Arc::new(DieselCoordinationStore::new(pool.clone())),
        config.app_name.clone(),
        config.lease_window,
    ));
    let reconciler = SubscriptionReconciler::new(
        Arc::new(registry),
        Arc::new(DieselSubscriptionMappingRepository::new(pool)),
        config.target.clone(),
    );

    Ok(RegistrationOrchestrator::new(
        SchemaInitializer::new(Arc::new(provisioner), config.stale_after),
        elector,
        reconciler,
        Arc::new(TokioSleeper),
        config.schedule,
    ))
}
