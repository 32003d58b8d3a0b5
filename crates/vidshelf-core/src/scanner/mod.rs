pub mod batch;
pub mod walk;
pub mod window;

pub use batch::{BatchScanner, FileOutcome, ScanContext, SkipReason};
pub use walk::{discover_categories, enumerate_files};
pub use window::TimeWindow;
