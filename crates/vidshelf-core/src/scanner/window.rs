use crate::config::{AppConfig, RunOptions};
use crate::platform;
use crate::storage::WatermarkStore;
use std::fs;
use std::path::Path;
use tracing::{info, warn};

const SECONDS_PER_DAY: f64 = 86_400.0;

/// Which files are recent enough to be picked up by this run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TimeWindow {
    All,
    /// Files changed strictly after this Unix timestamp.
    Since(f64),
}

impl TimeWindow {
    /// Full rescan takes everything, an explicit day count looks back that
    /// far, otherwise the stored watermark is used. A live run moves the
    /// watermark to `now` in the same transaction that reads it; a dry run
    /// only reads it.
    pub fn resolve(
        options: &RunOptions,
        config: &AppConfig,
        store: Option<&WatermarkStore>,
        now: f64,
    ) -> Self {
        let default = now - config.default_days_back * SECONDS_PER_DAY;

        let watermark = match store {
            Some(store) if options.dry_run => store.last_exec().unwrap_or_else(|e| {
                warn!("Cannot read watermark: {}", e);
                None
            }),
            Some(store) => match store.get_last_exec_and_update(now, default) {
                Ok(last) => Some(last),
                Err(e) => {
                    warn!("Cannot update watermark: {}", e);
                    None
                }
            },
            None => None,
        };

        let window = if options.full_rescan {
            TimeWindow::All
        } else if let Some(days) = options.days {
            TimeWindow::Since(now - days * SECONDS_PER_DAY)
        } else {
            TimeWindow::Since(watermark.unwrap_or(default))
        };
        info!("Time window: {:?}", window);
        window
    }

    pub fn admits(&self, path: &Path) -> bool {
        match self {
            TimeWindow::All => true,
            TimeWindow::Since(cutoff) => match fs::metadata(path) {
                Ok(metadata) => platform::change_time(&metadata) > *cutoff,
                Err(e) => {
                    warn!("Cannot stat {}: {}", path.display(), e);
                    false
                }
            },
        }
    }
}
