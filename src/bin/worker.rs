use std::sync::Arc;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use patd::{config::AppConfig, default_tasks, AppState, Scheduler};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "worker",
        database_url = %config.redacted_database_url(),
        pool_size = config.database_max_pool_size,
        llm_model = %config.llm.model,
        tick_seconds = config.deadline_tick_interval.as_secs(),
        "loaded configuration"
    );

    let state = Arc::new(AppState::from_config(&config, config.database_max_pool_size).await?);
    let mut scheduler = Scheduler::new(
        state,
        default_tasks(config.deadline_tick_interval, config.sweep_interval),
    );

    tokio::select! {
        _ = scheduler.run() => {}
        _ = signal::ctrl_c() => {
            tracing::info!("worker received shutdown signal");
        }
    }

    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}
