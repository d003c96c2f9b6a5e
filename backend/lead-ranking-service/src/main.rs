use lead_ranking_service::jobs::run_reconcile_job;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    info!("Starting lead-ranking-service reconcile job");

    run_reconcile_job().await.map_err(|e| {
        error!(error = %e, "Reconcile job failed");
        e
    })?;

    Ok(())
}
