use colored::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_LEVEL: &str = "warn";

/// Picks the log filter: `RUST_LOG` wins, then an explicit level, then
/// `debug` when verbose, then the configured level.
pub fn filter_directive(explicit: Option<&str>, verbose: bool, configured: Option<&str>) -> String {
    if let Some(level) = explicit {
        return level.to_string();
    }
    if verbose {
        return "debug".to_string();
    }
    configured.unwrap_or(DEFAULT_LEVEL).to_string()
}

/// Installs the global tracing subscriber, writing to stderr so log lines
/// never interleave with the transcript on stdout.
pub fn init(directive: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .init();
}

/// Shows an error to the user on stderr.
pub fn report_error(message: &str) {
    eprintln!("{} {}", "[ERROR]".red().bold(), message);
}
