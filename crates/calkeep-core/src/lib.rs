pub mod config;
pub mod error;

pub use config::{
    CalendarConfig, Config, DisplayConfig, GoogleConfig, LoggingConfig, ValidationResult,
};
pub use error::{AuthError, NetworkError, ReqwestErrorExt};

use anyhow::Result;

/// Initialize tracing/logging.
///
/// `RUST_LOG` wins when set; otherwise `default_level` (usually
/// `logging.level` from the config file) is used.
pub fn init_logging(default_level: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    tracing::info!("Calkeep logging initialized");
    Ok(())
}
