//! Memory engine exposing store, retrieve, stats and clear operations.

pub mod core;

pub use core::{MemoryEngine, RetrieveMemoryRequest, RetrieveMemoryResponse, StoreMemoryRequest};
