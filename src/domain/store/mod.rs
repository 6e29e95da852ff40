//! Store domain - key-value persistence abstraction

mod repository;

pub use repository::{KeyValueStore, KeyValueStoreExt};
