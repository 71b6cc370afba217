//! Input/output: errors, defaults, dataset files, reports and the CLI

/// Command-line interface and batch runner
pub mod cli;
/// Default parameters and tuning constants
pub mod configuration;
/// Error types shared by the whole crate
pub mod error;
/// Dataset file parsing
pub mod loader;
/// Diagnostic logging setup
pub mod logging;
/// Progress display for batch runs
pub mod progress;
/// JSON report output
pub mod report;
