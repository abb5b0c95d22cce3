//! Armsight weapon detection service - Main Entry Point

use api::{init_logging, run_server, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.logging)?;

    info!("=== Armsight v{} ===", env!("CARGO_PKG_VERSION"));
    info!("Starting weapon detection service...");

    run_server(settings).await
}
