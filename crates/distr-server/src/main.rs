//! distr server: application entry point.

mod config;

use std::sync::Arc;

use anyhow::Context;
use distr_db::repository::{
    SurrealDeletionRepository, SurrealDeploymentRepository, SurrealResourceRepository,
    SurrealServiceRepository, SurrealSystemRepository,
};
use distr_db::{DbManager, run_migrations};
use distr_orchestrator::{ResourceOrchestrator, ServiceRegistry, revalidation_loop};
use distr_proto::{GrpcClientFactory, HttpSchemaFetcher};
use distr_vault::Vault;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("distr=info"));
    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    tracing::info!("Starting distr server...");

    let cfg = config::load().context("loading configuration")?;

    let db = DbManager::connect(&cfg.db())
        .await
        .context("connecting to SurrealDB")?;
    run_migrations(db.client())
        .await
        .context("running migrations")?;

    let vault = Vault::new(&cfg.vault()).context("deriving vault key")?;

    let fetcher = HttpSchemaFetcher::default();
    let registry = Arc::new(ServiceRegistry::new(
        SurrealServiceRepository::new(db.client().clone()),
        fetcher.clone(),
        GrpcClientFactory::new(Arc::new(fetcher)),
    ));

    // No transport serves the orchestrator in this binary. It is handed to
    // the HTTP router alongside `registry` once that router exists.
    let _orchestrator = ResourceOrchestrator::new(
        SurrealSystemRepository::new(db.client().clone()),
        SurrealDeploymentRepository::new(db.client().clone()),
        SurrealResourceRepository::new(db.client().clone()),
        SurrealDeletionRepository::new(db.client().clone()),
        Arc::clone(&registry),
        vault,
    );
    tracing::info!("Resource orchestrator ready");

    let interval = cfg.registry().revalidation_interval();
    tracing::info!(interval_secs = interval.as_secs(), "Starting service revalidation");
    let sweeper = tokio::spawn(revalidation_loop(registry, interval));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    sweeper.abort();

    tracing::info!("distr server stopped.");
    Ok(())
}
