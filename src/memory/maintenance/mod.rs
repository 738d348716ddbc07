//! Maintenance and background cleanup for the memory store.

pub mod background_cleanup;

pub use background_cleanup::{BackgroundCleanup, CleanupConfig, CleanupHandle};
