// src/lib.rs
// Public library surface for the binary and integration tests.

// Versioned state file and deduplication core
pub mod dedup;
pub mod question;
pub mod state;
pub mod versioned;

// Collaborators: config, feed, notifications, storage, run loop
pub mod config;
pub mod notify;
pub mod runner;
pub mod stack;
pub mod storage;

// ---- Re-exports for stable public API ----
pub use crate::question::Question;
pub use crate::state::{DedupState, StateRecord};
pub use crate::versioned::{FormatError, JsonCodec, VersionedRecordReader};
