//! Progress display over the center cell types of a batch run

use crate::io::configuration::PROGRESS_BAR_WIDTH;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Single progress bar advancing once per analyzed center type
pub struct ProgressManager {
    bar: ProgressBar,
}

impl Default for ProgressManager {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressManager {
    /// Create a hidden progress manager; call [`initialize`](Self::initialize)
    /// to show it
    pub fn new() -> Self {
        Self {
            bar: ProgressBar::hidden(),
        }
    }

    /// Show a bar sized for `center_types` analyses
    pub fn initialize(&mut self, center_types: usize, operation: &str) {
        let template = format!(
            "[{{elapsed_precise}}] {{prefix}} [{{bar:{PROGRESS_BAR_WIDTH}.cyan/blue}}] {{pos}}/{{len}} {{msg}}"
        );
        let style = ProgressStyle::default_bar()
            .template(&template)
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▉▊▋▌▍▎▏ ");

        self.bar = ProgressBar::new(center_types as u64);
        self.bar.set_style(style);
        self.bar.set_prefix(operation.to_string());
        self.bar.enable_steady_tick(Duration::from_millis(200));
    }

    /// Report the center type now being analyzed
    pub fn start_center(&self, center: &str) {
        self.bar.set_message(center.to_string());
    }

    /// Mark one center type as done
    pub fn complete_center(&self) {
        self.bar.inc(1);
    }

    /// Number of center types completed so far
    pub fn position(&self) -> u64 {
        self.bar.position()
    }

    /// Remove the bar from the terminal
    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}
