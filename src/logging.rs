//! Log output for the `stylevec` binary.
//!
//! The library only emits `tracing` events. This installs a fmt subscriber on
//! stderr so stdout stays clean for command output and `--json`.

use tracing_subscriber::EnvFilter;
use tracing_subscriber::prelude::*;

use crate::config::LoggingConfig;

/// Filter used when neither `RUST_LOG` nor settings provide a usable one.
const FALLBACK_FILTER: &str = "warn";

/// Build the filter: `RUST_LOG` first, then `verbose`, then settings.
pub fn build_filter(config: &LoggingConfig, verbose: bool) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("stylevec=debug,info")
        } else {
            EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new(FALLBACK_FILTER))
        }
    })
}

/// Install the global subscriber. Later calls are ignored.
pub fn init(config: &LoggingConfig, verbose: bool) {
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(verbose);

    let _ = tracing_subscriber::registry()
        .with(build_filter(config, verbose))
        .with(layer)
        .try_init();
}
