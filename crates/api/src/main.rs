//! Face Quality API - Main Entry Point

use face_quality_api::{init_logging, run_server, ServiceConfig};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::load()?;
    init_logging(&config.log_level, config.log_json)?;

    info!("=== Face Quality API v{} ===", env!("CARGO_PKG_VERSION"));
    info!(
        decimal_precision = config.analysis.decimal_precision,
        eyes_closed_threshold = config.analysis.eyes_closed_threshold,
        mouth_open_threshold = config.analysis.mouth_open_threshold,
        upsample = config.analysis.upsample,
        "Analysis settings"
    );

    run_server(config).await?;

    Ok(())
}
