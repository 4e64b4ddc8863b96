//! Reconciliation Worker
//!
//! Runs the tenant expiry reconciliation sweep on a schedule, so trial
//! expiry and tenant suspension are corrected even when nobody is looking
//! at the dashboard. Each sweep is the same pure aggregation pass the
//! dashboard uses; only the staged corrective writes are of interest here.
//!
//! ## Environment Variables
//! - `DATABASE_URL`: PostgreSQL connection string
//! - `RECONCILE_SCHEDULE`: cron expression (default: every 15 minutes)

use std::sync::Arc;

use anyhow::Context;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tenantry_engine::DirectoryService;
use tenantry_shared::db;

const DEFAULT_SCHEDULE: &str = "0 */15 * * * *";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url = std::env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let schedule =
        std::env::var("RECONCILE_SCHEDULE").unwrap_or_else(|_| DEFAULT_SCHEDULE.to_string());

    // Migrations run on a dedicated single-connection pool
    let migration_pool = db::create_migration_pool(&database_url)
        .await
        .context("Failed to connect for migrations")?;
    db::run_migrations(&migration_pool)
        .await
        .context("Failed to run migrations")?;
    migration_pool.close().await;

    let pool = db::create_pool(&database_url)
        .await
        .context("Failed to create database pool")?;
    let service = Arc::new(DirectoryService::new(pool));

    info!(schedule = %schedule, "Starting reconciliation worker");

    let scheduler = JobScheduler::new().await?;
    let job_service = service.clone();
    scheduler
        .add(Job::new_async(schedule.as_str(), move |_id, _lock| {
            let service = job_service.clone();
            Box::pin(async move {
                match service.reconcile_once().await {
                    Ok(outcome) => info!(
                        scanned_users = outcome.scanned_users,
                        expired_users = outcome.expired_users,
                        suspended_tenants = outcome.suspended_tenants,
                        "Reconciliation sweep complete"
                    ),
                    Err(err) => error!(error = %err, "Reconciliation sweep failed"),
                }
            })
        })?)
        .await?;
    scheduler.start().await?;

    // One sweep right away so a fresh deploy doesn't wait a full interval
    match service.reconcile_once().await {
        Ok(outcome) => info!(
            scanned_users = outcome.scanned_users,
            expired_users = outcome.expired_users,
            suspended_tenants = outcome.suspended_tenants,
            "Initial reconciliation sweep complete"
        ),
        Err(err) => error!(error = %err, "Initial reconciliation sweep failed"),
    }

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    info!("Shutting down reconciliation worker");

    Ok(())
}
