use std::process::ExitCode;
use std::sync::Arc;

use user_service::prelude::*;

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = init_tracing(&config) {
        eprintln!("{}", e);
        return ExitCode::FAILURE;
    }

    match run(config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error starting server: {}", e);
            ExitCode::FAILURE
        }
    }
}

/// Connect, serve until a shutdown signal, then disconnect.
///
/// Errors before the listener is up abort startup. Errors while shutting down are logged
/// and do not change the exit status.
async fn run(config: Config) -> Result<()> {
    config.validate()?;

    tracing::info!(mode = %config.storage.mode, "Connecting to database");
    let store = Arc::new(UserStore::connect(&config.storage).await?);

    let app = router(AppState::new(config.clone(), store.clone()));
    let served = Server::new(config).serve(app).await;

    if let Err(e) = store.disconnect().await {
        tracing::warn!("Error while disconnecting from database: {}", e);
    }

    match served {
        Ok(()) => {
            tracing::info!("Server shut down.");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
