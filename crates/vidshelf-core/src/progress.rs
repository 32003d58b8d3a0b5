/// Trait for reporting run progress.
///
/// The CLI implements it with indicatif bars. All methods have default
/// no-op implementations.
pub trait ProgressReporter: Send + Sync {
    fn on_scan_start(&self, _total_files: usize) {}
    fn on_scan_progress(&self, _files_done: usize, _current_path: &str) {}
    fn on_scan_complete(&self, _accepted: usize, _duration_secs: f64) {}
    fn on_place_start(&self, _total_records: usize) {}
    fn on_place_progress(&self, _records_done: usize, _current_path: &str) {}
    fn on_place_complete(&self, _succeeded: usize, _failed: usize, _duration_secs: f64) {}
    fn on_cleanup_start(&self, _phase: &str) {}
    fn on_cleanup_complete(&self, _phase: &str, _changes: usize) {}
}

/// No-op progress reporter for silent operation.
pub struct SilentReporter;

impl ProgressReporter for SilentReporter {}
