//! Tracing subscriber setup.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Builds the default filter for the requested verbosity.
///
/// Library crates stay at `warn` unless verbose output is requested.
pub fn default_filter(verbose: bool, quiet: bool) -> String {
    let level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    format!("hookgate={level},hookgate_core={level},hyper=warn,reqwest=warn")
}

/// Installs the global tracing subscriber.
///
/// `RUST_LOG` takes precedence over the verbosity flags.
pub fn init_tracing(json: bool, verbose: bool, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer().with_target(verbose)).init();
    }
}
