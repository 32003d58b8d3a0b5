use indicatif::{ProgressBar, ProgressStyle};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use vidshelf_core::ProgressReporter;

const TICKS: &str = "⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏";

/// Indicatif progress for a run.
///
/// - Scan phase: bar over the files admitted by the time window
/// - Place phase: bar over the accepted records, or plain lines when the
///   run asks questions on the terminal
/// - Cleanup phases: spinner
pub struct CliReporter {
    bar: Mutex<Option<ProgressBar>>,
    interactive: bool,
}

impl CliReporter {
    pub fn new(interactive: bool) -> Self {
        Self {
            bar: Mutex::new(None),
            interactive,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ProgressBar>> {
        self.bar.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn set_bar(&self, pb: ProgressBar) {
        let mut guard = self.lock();
        if let Some(old) = guard.take() {
            old.finish_and_clear();
        }
        *guard = Some(pb);
    }

    fn finish_bar(&self) {
        if let Some(pb) = self.lock().take() {
            pb.finish_and_clear();
        }
    }

    fn counting_bar(total: usize, label: &str) -> ProgressBar {
        let pb = ProgressBar::new(total as u64);
        let template = format!(
            "  {{spinner:.cyan}} {} [{{bar:30.cyan/dim}}] {{pos}}/{{len}} files ({{eta}} remaining)",
            label
        );
        if let Ok(style) = ProgressStyle::with_template(&template) {
            pb.set_style(style.progress_chars("━╸─").tick_chars(TICKS));
        }
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }

    fn spinner(message: String) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::with_template("{spinner:.cyan} {msg}") {
            pb.set_style(style.tick_chars(TICKS));
        }
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(80));
        pb
    }
}

impl ProgressReporter for CliReporter {
    fn on_scan_start(&self, total_files: usize) {
        self.set_bar(Self::counting_bar(total_files, "Scanning"));
    }

    fn on_scan_progress(&self, files_done: usize, _current_path: &str) {
        if let Some(pb) = self.lock().as_ref() {
            pb.set_position(files_done as u64);
        }
    }

    fn on_scan_complete(&self, accepted: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Scan complete: {} files to place in {:.2}s",
            accepted, duration_secs
        );
    }

    fn on_place_start(&self, total_records: usize) {
        if !self.interactive {
            self.set_bar(Self::counting_bar(total_records, "Placing"));
        }
    }

    fn on_place_progress(&self, records_done: usize, current_path: &str) {
        if self.interactive {
            eprintln!("  [{}] {}", records_done, current_path);
        } else if let Some(pb) = self.lock().as_ref() {
            pb.set_position(records_done as u64);
        }
    }

    fn on_place_complete(&self, succeeded: usize, failed: usize, duration_secs: f64) {
        self.finish_bar();
        eprintln!(
            "  \x1b[32m✓\x1b[0m Placement complete: {} placed, {} failed in {:.2}s",
            succeeded, failed, duration_secs
        );
    }

    fn on_cleanup_start(&self, phase: &str) {
        self.set_bar(Self::spinner(format!("Cleanup: {}...", phase)));
    }

    fn on_cleanup_complete(&self, phase: &str, changes: usize) {
        self.finish_bar();
        if changes > 0 {
            eprintln!("  \x1b[32m✓\x1b[0m Cleanup {}: {} changes", phase, changes);
        }
    }
}
