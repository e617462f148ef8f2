//! `indicatif` spinner behind the library's [`Progress`] trait.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use ucmap::Progress;

pub struct SpinnerProgress {
    bar: ProgressBar,
}

impl SpinnerProgress {
    /// A hidden spinner when `quiet`, so log output is not interleaved.
    pub fn new(quiet: bool) -> Self {
        let bar = if quiet { ProgressBar::hidden() } else { ProgressBar::new_spinner() };
        bar.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg} [{elapsed}]")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        Self { bar }
    }
}

impl Progress for SpinnerProgress {
    fn start(&self, label: &str, max: u64) {
        if max > 0 {
            self.bar.set_length(max);
        }
        self.bar.set_message(label.to_string());
        self.bar.enable_steady_tick(Duration::from_millis(100));
    }

    fn set_text(&self, label: &str) {
        self.bar.set_message(label.to_string());
    }

    fn close(&self) {
        self.bar.finish_and_clear();
    }
}
