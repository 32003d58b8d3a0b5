/// A known fingerprint in a category registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRecord {
    pub hash: String,
    pub filepath: String,
    pub filename: String,
    pub file_size: i64,
}
