//! In-memory segment store.
//!
//! Useful for tests and local runs. State lives in a single mutex that is
//! never held across an await point.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};

use super::{
    AppendOutcome, CreateOutcome, MAX_APPENDS_PER_SEGMENT, SegmentMetadata, SegmentStore,
    StorageError, StorageResult,
};

#[derive(Debug, Default)]
struct SegmentState {
    committed_count: u64,
    data: BytesMut,
}

type Container = BTreeMap<String, SegmentState>;

/// A [`SegmentStore`] that keeps every segment in process memory.
#[derive(Debug)]
pub struct InMemorySegmentStore {
    max_appends_per_segment: u64,
    containers: Mutex<HashMap<String, Container>>,
}

impl InMemorySegmentStore {
    /// Creates a store with the default per-segment capacity.
    pub fn new() -> Self {
        Self::with_max_appends(MAX_APPENDS_PER_SEGMENT)
    }

    /// Creates a store whose segments accept at most `max_appends` appends.
    pub fn with_max_appends(max_appends: u64) -> Self {
        Self {
            max_appends_per_segment: max_appends,
            containers: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the concatenated payloads of a segment, or `None` if it does not exist.
    pub fn contents(&self, container: &str, segment: &str) -> StorageResult<Option<Bytes>> {
        let containers = self.lock()?;
        Ok(containers
            .get(container)
            .and_then(|c| c.get(segment))
            .map(|s| Bytes::copy_from_slice(&s.data)))
    }

    /// Returns the names of all segments in a container, in lexicographic order.
    pub fn segment_names(&self, container: &str) -> StorageResult<Vec<String>> {
        let containers = self.lock()?;
        Ok(containers
            .get(container)
            .map(|c| c.keys().cloned().collect())
            .unwrap_or_default())
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, HashMap<String, Container>>> {
        self.containers
            .lock()
            .map_err(|e| StorageError::Internal(format!("segment map poisoned: {}", e)))
    }
}

impl Default for InMemorySegmentStore {
    fn default() -> Self {
        Self::new()
    }
}

fn container_not_found(container: &str) -> StorageError {
    StorageError::Storage(format!("container '{}' not found", container))
}

#[async_trait]
impl SegmentStore for InMemorySegmentStore {
    fn max_appends_per_segment(&self) -> u64 {
        self.max_appends_per_segment
    }

    async fn create_container_if_absent(&self, container: &str) -> StorageResult<()> {
        let mut containers = self.lock()?;
        containers.entry(container.to_string()).or_default();
        Ok(())
    }

    async fn create_if_absent(
        &self,
        container: &str,
        segment: &str,
    ) -> StorageResult<CreateOutcome> {
        let mut containers = self.lock()?;
        let segments = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?;
        if segments.contains_key(segment) {
            return Ok(CreateOutcome::AlreadyExists);
        }
        segments.insert(segment.to_string(), SegmentState::default());
        Ok(CreateOutcome::Created)
    }

    async fn append_and_offset(
        &self,
        container: &str,
        segment: &str,
        payload: Bytes,
    ) -> StorageResult<AppendOutcome> {
        let mut containers = self.lock()?;
        let state = containers
            .get_mut(container)
            .ok_or_else(|| container_not_found(container))?
            .get_mut(segment)
            .ok_or_else(|| {
                StorageError::Storage(format!(
                    "segment '{}' not found in container '{}'",
                    segment, container
                ))
            })?;

        if state.committed_count >= self.max_appends_per_segment {
            return Ok(AppendOutcome::Conflict);
        }

        let offset = state.data.len() as u64;
        state.data.extend_from_slice(&payload);
        state.committed_count += 1;
        Ok(AppendOutcome::Appended(offset))
    }

    async fn fetch_metadata(
        &self,
        container: &str,
        segment: &str,
    ) -> StorageResult<Option<SegmentMetadata>> {
        let containers = self.lock()?;
        let segments = containers
            .get(container)
            .ok_or_else(|| container_not_found(container))?;
        Ok(segments.get(segment).map(|s| SegmentMetadata {
            committed_count: s.committed_count,
            byte_length: s.data.len() as u64,
        }))
    }
}
