use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use seqrun_core::ProgressReporter;
use std::sync::Mutex;
use std::time::Duration;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Spinner while files are collected (the count is unknown until the walk
/// ends), then a bar over the planned delivery actions.
pub struct CliReporter {
    active: Mutex<Option<ProgressBar>>,
}

impl CliReporter {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
        }
    }

    /// Swap the active indicator, clearing the previous one.
    fn replace(&self, next: Option<ProgressBar>) {
        let mut slot = self.active.lock().unwrap();
        if let Some(previous) = std::mem::replace(&mut *slot, next) {
            previous.finish_and_clear();
        }
    }

    fn spinner(message: String) -> ProgressBar {
        let spinner = ProgressBar::new_spinner().with_message(message);
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} {msg}")
                .unwrap()
                .tick_chars(TICKS),
        );
        spinner.enable_steady_tick(Duration::from_millis(80));
        spinner
    }

    fn done(message: String) {
        eprintln!("  {} {}", "✓".green(), message);
    }
}

impl ProgressReporter for CliReporter {
    fn on_collect_start(&self, root: &str) {
        self.replace(Some(Self::spinner(format!("Collecting files under {}...", root))));
    }

    fn on_collect_complete(&self, samples: usize, duration_secs: f64) {
        self.replace(None);
        Self::done(format!(
            "Collected files for {} samples in {:.2}s",
            samples, duration_secs
        ));
    }

    fn on_transfer_start(&self, total_actions: usize) {
        let bar = ProgressBar::new(total_actions as u64);
        bar.set_style(
            ProgressStyle::with_template(
                "  {spinner:.cyan} Delivering [{bar:30.cyan/dim}] {pos}/{len} {wide_msg:.dim}",
            )
            .unwrap()
            .progress_chars("━╸─")
            .tick_chars(TICKS),
        );
        bar.enable_steady_tick(Duration::from_millis(80));
        self.replace(Some(bar));
    }

    fn on_transfer_progress(&self, done: usize, current_path: &str) {
        if let Some(bar) = self.active.lock().unwrap().as_ref() {
            bar.set_position(done as u64);
            bar.set_message(current_path.to_string());
        }
    }

    fn on_transfer_complete(&self, succeeded: usize, failed: usize, duration_secs: f64) {
        self.replace(None);
        let failed = if failed > 0 {
            failed.to_string().red()
        } else {
            failed.to_string().normal()
        };
        Self::done(format!(
            "Delivery complete: {} done, {} failed in {:.2}s",
            succeeded, failed, duration_secs
        ));
    }
}
