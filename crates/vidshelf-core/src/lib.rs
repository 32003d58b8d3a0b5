pub mod cleanup;
pub mod collab;
pub mod config;
pub mod engine;
pub mod error;
pub mod fs_ops;
pub mod hasher;
pub mod migrator;
pub mod model;
pub mod placement;
pub mod platform;
pub mod progress;
pub mod scanner;
pub mod storage;
pub mod text;

pub use collab::{Classifier, ConflictResolver, KeepBothResolver, ManifestClassifier};
pub use config::{AppConfig, RunOptions};
pub use engine::{PlacementEngine, RunReport};
pub use error::Error;
pub use model::{Category, Classification, ConflictDecision, Placement, VideoRecord};
pub use progress::{ProgressReporter, SilentReporter};
