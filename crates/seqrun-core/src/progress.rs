/// Trait for reporting collection and delivery progress.
///
/// The CLI implements it with indicatif progress bars. All methods have
/// default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_collect_start(&self, _root: &str) {}
    fn on_collect_complete(&self, _samples: usize, _duration_secs: f64) {}
    fn on_transfer_start(&self, _total_actions: usize) {}
    fn on_transfer_progress(&self, _done: usize, _current_path: &str) {}
    fn on_transfer_complete(&self, _succeeded: usize, _failed: usize, _duration_secs: f64) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
