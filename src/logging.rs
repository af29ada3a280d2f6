//! Tracing subscriber setup for the `swot` binary.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialise logging to stderr.
///
/// `RUST_LOG` takes precedence; otherwise `debug` forces the debug level and
/// `level` comes from the config file.
pub fn init(level: &str, debug: bool) {
    let level = if debug { "debug" } else { level };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("swot_workbench={level},swot={level}")));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(debug).with_writer(std::io::stderr))
        .try_init();
}
