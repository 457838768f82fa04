use std::env;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use patd::{config::AppConfig, deadline, AppState};

const USAGE: &str = "Usage: maintenance <tick|sweep-deleted|expired>";

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    let mut args = env::args().skip(1);
    let command = match args.next() {
        Some(command) => command,
        None => {
            eprintln!("{USAGE}");
            std::process::exit(1);
        }
    };
    if !matches!(command.as_str(), "tick" | "sweep-deleted" | "expired") {
        eprintln!("Unknown command: {command}\n{USAGE}");
        std::process::exit(1);
    }

    let config = AppConfig::from_env()?;
    tracing::info!(
        component = "maintenance",
        database_url = %config.redacted_database_url(),
        pool_size = 1,
        "loaded configuration"
    );
    let state = AppState::from_config(&config, 1).await?;

    match command.as_str() {
        "tick" => {
            let report = deadline::tick_deadlines(&state).await?;
            println!(
                "Examined {} case(s): {} transitioned, {} deferred, {} failed.",
                report.examined, report.transitioned, report.deferred, report.failed
            );
        }
        "sweep-deleted" => {
            let report = deadline::sweep_soft_deleted(&state).await?;
            println!(
                "Purged {} case(s), removed {} blob(s), {} failure(s).",
                report.purged, report.blobs_removed, report.failed
            );
        }
        _ => {
            let expired = deadline::expired_patds_snapshot(&state).await?;
            if expired.is_empty() {
                println!("No expired cases.");
            }
            for patd in &expired {
                let deadline = patd
                    .deadline_end
                    .map(|deadline| deadline.to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!("{}\t{}\t{}", patd.case_number, patd.status, deadline);
            }
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
