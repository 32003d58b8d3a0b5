pub mod cache;
pub mod duplicates;
pub mod range;
pub mod resolver;

pub use cache::PlacementCache;
pub use duplicates::{DuplicateDetector, RunOverlay};
pub use range::RangeFolder;
pub use resolver::{PlacementResolver, SERIES_FALLBACK, UNDETECTED_FALLBACK};
