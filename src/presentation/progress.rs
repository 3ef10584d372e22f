use crate::domain::traits::Notifier;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

/// Shows loading messages on a terminal spinner.
pub struct SpinnerNotifier {
    bar: ProgressBar,
}

impl SpinnerNotifier {
    pub fn new() -> Self {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        bar.set_style(style);
        Self { bar }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl Default for SpinnerNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier for SpinnerNotifier {
    fn progress(&self, message: Option<&str>) {
        match message {
            Some(message) => {
                self.bar.enable_steady_tick(Duration::from_millis(120));
                self.bar.set_message(message.to_string());
            }
            None => {
                self.bar.disable_steady_tick();
                self.bar.set_message("");
            }
        }
    }

    fn warning(&self, message: &str) {
        tracing::warn!("{}", message);
        self.bar.println(format!("⚠️  {}", message).yellow().to_string());
    }
}
