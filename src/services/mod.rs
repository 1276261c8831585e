//! Persistent store backends
//!
//! The timer core only talks to the [`KeyValueStore`] trait; the host picks
//! a backend at startup.

pub mod file_store;
pub mod store;

// Re-export main types
pub use file_store::FileStore;
pub use store::{KeyValueStore, MemoryStore};
