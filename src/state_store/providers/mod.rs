//! State store provider implementations

pub mod memory;
pub mod noop;

pub use memory::MemoryStateStore;
pub use noop::NoOpStateStore;
