mod config;

use std::sync::Arc;

use assetbook_core::depreciation::{DepreciationService, DepreciationServiceTrait, RunStatus};
use assetbook_storage_sqlite::{
    create_pool, init, run_migrations, spawn_writer, DepreciationRepository,
};
use chrono::Utc;
use config::Config;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing() {
    let log_format = std::env::var("ASSETBOOK_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    // Logs go to stderr; stdout carries the run output.
    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_line_number(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing();

    let period = config.period(Utc::now().date_naive())?;
    let db_path = init(&config.db_path)?;
    tracing::info!("Database path in use: {}", db_path);

    let pool = create_pool(&db_path)?;
    run_migrations(&pool)?;
    let writer = spawn_writer((*pool).clone());
    let repository = Arc::new(DepreciationRepository::new(pool, writer));
    let service = DepreciationService::with_settings(repository, config.run_settings());

    let result = service
        .run(config.tenant_id, period.start, period.end, config.dry_run)
        .await;
    if let Some(failure) = &result.failure {
        tracing::error!("Run failed: {}", failure);
    }

    println!("{}", serde_json::to_string_pretty(&result.output())?);

    if result.status == RunStatus::Failed {
        std::process::exit(1);
    }
    Ok(())
}
