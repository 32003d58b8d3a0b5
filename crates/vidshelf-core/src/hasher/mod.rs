pub mod fingerprint;

pub use fingerprint::{fingerprint, hash_data};
