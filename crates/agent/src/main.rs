//! CheatGuard Agent - Main Entry Point

use agent::{init_logging, run, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load()?;
    init_logging(&settings.log_level)?;

    info!("=== CheatGuard Agent v{} ===", env!("CARGO_PKG_VERSION"));
    run(settings).await?;

    Ok(())
}
