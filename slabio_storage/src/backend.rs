//! Storage backends.

mod memory_backend;

pub use memory_backend::{FailurePoint, MemoryBackend};
