//! Tracing subscriber setup for the catalog service.

use catalog_kernel::settings::{LogFormat, TelemetrySettings};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global subscriber. `RUST_LOG` wins over `telemetry.log_level`.
///
/// Calling this twice is harmless: the second subscriber is dropped and the
/// first one stays in place.
pub fn init(settings: &TelemetrySettings) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.log_level))?;

    let registry = tracing_subscriber::registry().with(filter);
    let installed = match settings.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_current_span(true))
            .try_init(),
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
    };

    match installed {
        Ok(()) => tracing::info!(
            target: "catalog-telemetry",
            format = ?settings.log_format,
            level = %settings.log_level,
            "telemetry initialized"
        ),
        Err(err) => tracing::debug!(
            target: "catalog-telemetry",
            error = %err,
            "subscriber already installed"
        ),
    }

    Ok(())
}
