//! services/scheduler/src/bin/scheduler.rs

use intake_scheduler_core::ports::{PlanRepository, RecordRepository, SystemClock};
use intake_scheduler_core::services::GenerationService;
use scheduler_lib::{
    adapters::{DbAdapter, InMemoryPlanRepository, InMemoryRecordRepository},
    config::Config,
    daemon::GenerationDaemon,
    error::SchedulerError,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), SchedulerError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Config::from_env()?;
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting scheduler...");

    // --- 2. Select Storage ---
    let (plans, records): (Arc<dyn PlanRepository>, Arc<dyn RecordRepository>) =
        match &config.database_url {
            Some(url) => {
                info!("Connecting to database...");
                let db_pool = PgPoolOptions::new()
                    .max_connections(config.db_max_connections)
                    .connect(url)
                    .await?;
                let db_adapter = Arc::new(DbAdapter::new(db_pool));
                info!("Running database migrations...");
                db_adapter.run_migrations().await?;
                info!("Database migrations complete.");
                let plans: Arc<dyn PlanRepository> = db_adapter.clone();
                let records: Arc<dyn RecordRepository> = db_adapter;
                (plans, records)
            }
            None => {
                warn!("DATABASE_URL is not set, using in-memory storage.");
                let plans: Arc<dyn PlanRepository> = InMemoryPlanRepository::arc();
                let records: Arc<dyn RecordRepository> = InMemoryRecordRepository::arc();
                (plans, records)
            }
        };

    // --- 3. Build the Generation Daemon ---
    let generation = Arc::new(GenerationService::new(plans, records, Arc::new(SystemClock)));
    let daemon = GenerationDaemon::new(
        generation,
        config.generation_interval,
        config.generation_batch_size,
        config.creation_shift,
    );

    // --- 4. Wire Shutdown ---
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for the shutdown signal: {}", e);
            return;
        }
        info!("Shutdown signal received.");
        shutdown.cancel();
    });

    // --- 5. Run Until Cancelled ---
    daemon.run(cancel).await;
    info!("Scheduler exited cleanly.");
    Ok(())
}
