//! Campus Events
//!
//! Maintenance entry point: connects, applies migrations and audits the
//! derived event counters. Pass a college id to audit a single tenant.

use std::sync::Arc;
use anyhow::Context;
use chrono::Utc;
use tracing::{error, info, warn};

use campus_events::{
    config::Settings,
    utils::{helpers::format_timestamp, logging},
    database::{DatabaseService, connection::{create_pool, run_migrations, DatabaseConfig}},
    services::ServiceFactory,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    // Load configuration
    let settings = Settings::new().context("failed to load configuration")?;
    settings.validate()?;

    // Initialize logging; the guard keeps the file writer alive
    let _guard = logging::init_logging(&settings.logging)?;

    info!("Starting {}", campus_events::info());

    let tenant_id = match std::env::args().nth(1) {
        Some(raw) => Some(raw.parse::<i64>().with_context(|| format!("invalid college id: {}", raw))?),
        None => None,
    };

    // Initialize database connection
    info!("Connecting to database...");
    let pool = create_pool(&DatabaseConfig::from(&settings.database)).await?;

    // Run database migrations
    info!("Running database migrations...");
    run_migrations(&pool).await?;

    let services = ServiceFactory::new(Arc::new(DatabaseService::new(pool)), &settings);
    let health = services.health_check().await;
    if !health.is_healthy() {
        error!("Store is unhealthy, aborting audit");
        anyhow::bail!("database health check failed");
    }

    let started = Utc::now();
    let drift = services.catalog.audit_counters(tenant_id).await?;

    let report = serde_json::json!({
        "audited_at": format_timestamp(started),
        "tenant_id": tenant_id,
        "drifted_events": drift,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);

    if drift.is_empty() {
        info!("All event counters are consistent");
    } else {
        warn!(drifted = drift.len(), "Event counters disagree with registration rows");
        anyhow::bail!("{} events have counter drift", drift.len());
    }

    Ok(())
}
