//!
//! Diagnostics setup for hosts embedding the connector.
//!
use tracing_subscriber::EnvFilter;

use crate::settings::Settings;

/// Install a global fmt subscriber filtered by `filter` (e.g. `"info,cloud_connector=debug"`).
///
/// An unparsable filter falls back to `info`. Returns `false` if a global subscriber was
/// already installed.
pub fn init(filter: &str) -> bool {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber).is_ok()
}

pub fn log_startup(settings: &Settings) {
    tracing::info!(
        url_base_path = %settings.url_base_path,
        mqtt_broker_address = %settings.mqtt_broker_address,
        "Cloud connector starting with settings:\n{}",
        settings
    );
}
