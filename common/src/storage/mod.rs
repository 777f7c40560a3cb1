//! Segment storage abstraction.
//!
//! A segment is a named, append-only object that accepts a bounded number of
//! append operations before the backend refuses further writes. The traits in
//! this module expose the minimal primitives a chain of segments needs:
//! a conditional create, a serialized append that reports the offset it was
//! assigned, and a metadata probe.

pub mod config;
pub mod factory;
pub mod in_memory;
pub mod object;

use async_trait::async_trait;
use bytes::Bytes;

/// Number of append operations a segment accepts before the backend answers
/// with [`AppendOutcome::Conflict`].
pub const MAX_APPENDS_PER_SEGMENT: u64 = 50_000;

/// Errors returned by a segment store.
///
/// Conflicts are not errors: they are reported through [`AppendOutcome`] and
/// [`CreateOutcome`] so callers can match on them.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// The backend failed the request.
    #[error("storage error: {0}")]
    Storage(String),
    /// The store reached a state it should never be in.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StorageError {
    /// Wraps any backend error as [`StorageError::Storage`].
    pub fn from_storage(e: impl std::fmt::Display) -> Self {
        StorageError::Storage(e.to_string())
    }
}

pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Result of a conditional segment create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreateOutcome {
    /// This call created the segment.
    Created,
    /// The segment was already present, created earlier or by a concurrent peer.
    AlreadyExists,
}

/// Result of an append against a single segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// The payload was accepted and starts at this byte offset within the segment.
    Appended(u64),
    /// The backend refused the append, usually because the segment is full.
    Conflict,
}

/// Backend-observable attributes of an existing segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SegmentMetadata {
    /// Number of appends the segment has accepted.
    pub committed_count: u64,
    /// Total number of payload bytes in the segment.
    pub byte_length: u64,
}

/// Storage backend holding capacity-bounded append segments.
///
/// Properties required from implementations:
/// - `create_if_absent` is atomic: of any number of concurrent creates for the
///   same name, exactly one observes [`CreateOutcome::Created`].
/// - Appends to one segment are serialized and receive strictly increasing,
///   non-overlapping offsets.
/// - Once a segment has accepted `max_appends_per_segment` appends, every
///   further append returns [`AppendOutcome::Conflict`].
///
/// The backend is the source of truth. Implementations may cache hints
/// locally but must stay correct when other processes write the same segments.
#[async_trait]
pub trait SegmentStore: Send + Sync {
    /// Maximum number of appends a single segment accepts.
    fn max_appends_per_segment(&self) -> u64;

    /// Provisions the container holding segments. Idempotent.
    async fn create_container_if_absent(&self, container: &str) -> StorageResult<()>;

    /// Creates an empty segment unless one with that name already exists.
    async fn create_if_absent(&self, container: &str, segment: &str)
    -> StorageResult<CreateOutcome>;

    /// Appends `payload` to an existing segment.
    ///
    /// Appending to a segment that does not exist is an error.
    async fn append_and_offset(
        &self,
        container: &str,
        segment: &str,
        payload: Bytes,
    ) -> StorageResult<AppendOutcome>;

    /// Returns the segment's metadata, or `None` if it does not exist.
    async fn fetch_metadata(
        &self,
        container: &str,
        segment: &str,
    ) -> StorageResult<Option<SegmentMetadata>>;
}
