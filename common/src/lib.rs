//! Shared storage layer for segment chains.
//!
//! Provides the [`SegmentStore`] abstraction and its backends. Higher layers
//! build unbounded logs out of capacity-bounded segments on top of it.

pub mod storage;

pub use storage::config::StorageConfig;
pub use storage::{
    AppendOutcome, CreateOutcome, MAX_APPENDS_PER_SEGMENT, SegmentMetadata, SegmentStore,
    StorageError, StorageResult,
};
