use clap::Parser;
use reviewer_assigner::services::http_api::AppState;
use reviewer_assigner::services::{http_server, RandomPicker, ReviewAssignmentEngine};
use reviewer_assigner::{db, AppError, Config};
use std::process::ExitCode;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::parse();
    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(config: Config) -> Result<(), AppError> {
    config.validate()?;

    let pool = db::initialize(&config.database_path).await?;
    log::info!("[db] Using database at {}", config.database_path.display());

    let picker = match config.reviewer_seed {
        Some(seed) => {
            log::info!("[assign] Using fixed reviewer seed {}", seed);
            RandomPicker::seeded(seed)
        }
        None => RandomPicker::from_entropy(),
    };
    let engine = ReviewAssignmentEngine::with_picker(pool.clone(), Arc::new(picker));
    let state = AppState::new(pool.clone(), engine);

    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                log::info!("Shutdown signal received");
                signal.cancel();
            }
            Err(e) => log::error!("Failed to listen for shutdown signal: {}", e),
        }
    });

    let result = http_server::serve(&config, state, shutdown).await;
    pool.close().await;
    result
}
