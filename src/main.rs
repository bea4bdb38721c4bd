use std::sync::Arc;

use tracing::info;

use holdshelf::catalog::InMemoryCatalog;
use holdshelf::config::Config;
use holdshelf::engine::Engine;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    holdshelf::observability::init_tracing();

    let config = Config::from_env();
    holdshelf::observability::init(config.metrics_port)?;

    let catalog = match &config.catalog_path {
        Some(path) => InMemoryCatalog::load(path)?,
        None => InMemoryCatalog::new(),
    };
    let book_count = catalog.len();

    let engine = Arc::new(Engine::new(Arc::new(catalog), config.clone()));
    info!("holdshelf engine ready");
    info!("  books: {book_count}");
    info!("  max_active_per_book: {}", engine.config().max_active_per_book);
    info!("  guard_approvals: {}", engine.config().guard_approvals);
    info!(
        "  metrics: {}",
        config
            .metrics_port
            .map_or("disabled".to_string(), |p| format!("http://0.0.0.0:{p}/metrics"))
    );

    // Transports embed the engine; standalone we just hold it until shutdown.
    let shutdown = async {
        let ctrl_c = tokio::signal::ctrl_c();
        #[cfg(unix)]
        {
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(mut sigterm) => {
                    tokio::select! {
                        _ = ctrl_c => {}
                        _ = sigterm.recv() => {}
                    }
                }
                Err(e) => {
                    tracing::warn!("failed to register SIGTERM handler: {e}");
                    ctrl_c.await.ok();
                }
            }
        }
        #[cfg(not(unix))]
        {
            ctrl_c.await.ok();
        }
    };
    shutdown.await;

    info!(
        appointments = engine.appointment_count(),
        "shutdown signal received, holdshelf stopped"
    );
    Ok(())
}
