//! Tracing / logging initialisation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Level or full filter directives: "info", "warn,chainwatch_evm=debug", ...
    pub level: String,
    /// Emit JSON structured logs (true) or human-readable text (false)
    pub json: bool,
}

/// Filter for `level`, falling back to `info` for unparsable directives.
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise tracing once at startup. Logs go to stderr; stdout is
/// reserved for event lines.
pub fn init_tracing(config: &LogConfig) {
    let filter = build_filter(&config.level);

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
