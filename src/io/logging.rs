//! Diagnostic logging setup for the command-line tool

use tracing_subscriber::EnvFilter;

/// Log level implied by `--quiet` and the `-v` count
pub const fn level_for(quiet: bool, verbosity: u8) -> &'static str {
    if quiet {
        return "error";
    }
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install a stderr subscriber; `RUST_LOG` overrides the flag-derived level
///
/// Returns `false` if a global subscriber was already installed.
pub fn init(quiet: bool, verbosity: u8) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for(quiet, verbosity)));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .is_ok()
}
