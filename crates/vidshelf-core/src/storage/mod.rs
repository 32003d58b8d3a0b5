pub mod app_state;
pub mod hash_registry;
pub mod models;
pub mod queries;
pub mod sqlite;

pub use app_state::WatermarkStore;
pub use hash_registry::{HashRegistries, HashRegistry};
pub use models::HashRecord;
pub use sqlite::Database;
