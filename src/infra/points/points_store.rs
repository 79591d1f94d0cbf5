// Implementations of the points ledger store.

pub mod in_memory;
pub mod json_store;
pub mod ledger;

// Re-export for convenience
pub use in_memory::InMemoryPointsStore;
pub use json_store::JsonPointsStore;
