//! Segment store on top of an [`ObjectStore`].
//!
//! Object stores offer no native append, so a segment is laid out as a
//! prefix of immutable objects:
//!
//! ```text
//! <container>/_container
//! <container>/<segment>/_segment
//! <container>/<segment>/blocks/0000000000
//! <container>/<segment>/blocks/0000000001
//! ...
//! ```
//!
//! Every object is written with [`PutMode::Create`], which is the only
//! compare-and-swap the layout relies on. Block `n` starts with a 16-byte
//! header holding the block's start offset and payload length (both
//! big-endian `u64`), followed by the payload. A writer claims index `n` only
//! after reading the header of block `n - 1`, so blocks always form a gap-free
//! prefix of indexes.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use futures::TryStreamExt;
use object_store::path::Path;
use object_store::{ObjectStore, PutMode, PutPayload};

use super::{
    AppendOutcome, CreateOutcome, MAX_APPENDS_PER_SEGMENT, SegmentMetadata, SegmentStore,
    StorageError, StorageResult,
};

const CONTAINER_MARKER: &str = "_container";
const SEGMENT_MARKER: &str = "_segment";
const BLOCKS_DIR: &str = "blocks";
const BLOCK_HEADER_LEN: u64 = 16;

/// A [`SegmentStore`] backed by any [`ObjectStore`] that supports
/// conditional puts.
pub struct ObjectSegmentStore {
    store: Arc<dyn ObjectStore>,
    max_appends_per_segment: u64,
    /// Lower bound on the block count, per segment path. Only a starting
    /// point; a lost race on an index moves the writer forward.
    next_block: Mutex<HashMap<String, u64>>,
}

impl ObjectSegmentStore {
    /// Creates a store with the default per-segment capacity.
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self::with_max_appends(store, MAX_APPENDS_PER_SEGMENT)
    }

    /// Creates a store whose segments accept at most `max_appends` appends.
    pub fn with_max_appends(store: Arc<dyn ObjectStore>, max_appends: u64) -> Self {
        Self {
            store,
            max_appends_per_segment: max_appends,
            next_block: Mutex::new(HashMap::new()),
        }
    }

    fn segment_prefix(container: &str, segment: &str) -> Path {
        Path::from_iter([container, segment])
    }

    fn segment_marker(container: &str, segment: &str) -> Path {
        Path::from_iter([container, segment, SEGMENT_MARKER])
    }

    fn blocks_prefix(container: &str, segment: &str) -> Path {
        Path::from_iter([container, segment, BLOCKS_DIR])
    }

    fn block_path(container: &str, segment: &str, index: u64) -> Path {
        let name = format!("{:010}", index);
        Path::from_iter([container, segment, BLOCKS_DIR, name.as_str()])
    }

    /// Writes `payload` unless an object already exists at `path`.
    async fn put_if_absent(&self, path: &Path, payload: Bytes) -> StorageResult<CreateOutcome> {
        match self
            .store
            .put_opts(path, PutPayload::from(payload), PutMode::Create.into())
            .await
        {
            Ok(_) => Ok(CreateOutcome::Created),
            Err(object_store::Error::AlreadyExists { .. }) => Ok(CreateOutcome::AlreadyExists),
            Err(e) => Err(StorageError::from_storage(e)),
        }
    }

    async fn exists(&self, path: &Path) -> StorageResult<bool> {
        match self.store.head(path).await {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => Err(StorageError::from_storage(e)),
        }
    }

    /// Counts the blocks of a segment by listing them.
    async fn list_block_count(&self, container: &str, segment: &str) -> StorageResult<u64> {
        let prefix = Self::blocks_prefix(container, segment);
        let objects: Vec<_> = self
            .store
            .list(Some(&prefix))
            .try_collect()
            .await
            .map_err(StorageError::from_storage)?;

        let mut count = 0;
        for meta in objects {
            let index = meta
                .location
                .filename()
                .and_then(|name| name.parse::<u64>().ok())
                .ok_or_else(|| {
                    StorageError::Internal(format!("unexpected block object '{}'", meta.location))
                })?;
            count = count.max(index + 1);
        }
        Ok(count)
    }

    /// Counts the blocks of a segment.
    ///
    /// Starts from the cached hint and probes forward one block at a time.
    /// Lists the segment only when nothing is cached for it yet.
    async fn block_count(&self, container: &str, segment: &str, key: &str) -> StorageResult<u64> {
        let mut count = match self.hint(key)? {
            Some(next) => next,
            None => self.list_block_count(container, segment).await?,
        };
        while count < self.max_appends_per_segment
            && self
                .exists(&Self::block_path(container, segment, count))
                .await?
        {
            count += 1;
        }
        self.set_hint(key, count)?;
        Ok(count)
    }

    /// Returns the byte offset just past the end of block `index`.
    async fn block_end(&self, container: &str, segment: &str, index: u64) -> StorageResult<u64> {
        let path = Self::block_path(container, segment, index);
        let header = self
            .store
            .get_range(&path, 0..BLOCK_HEADER_LEN)
            .await
            .map_err(StorageError::from_storage)?;
        if header.len() as u64 != BLOCK_HEADER_LEN {
            return Err(StorageError::Internal(format!(
                "block '{}' has a truncated header",
                path
            )));
        }
        let mut header = header;
        let start = header.get_u64();
        let len = header.get_u64();
        Ok(start + len)
    }

    fn encode_block(offset: u64, payload: &Bytes) -> Bytes {
        let mut buf = BytesMut::with_capacity(BLOCK_HEADER_LEN as usize + payload.len());
        buf.put_u64(offset);
        buf.put_u64(payload.len() as u64);
        buf.put_slice(payload);
        buf.freeze()
    }

    fn hint(&self, key: &str) -> StorageResult<Option<u64>> {
        let hints = self
            .next_block
            .lock()
            .map_err(|e| StorageError::Internal(format!("block hints poisoned: {}", e)))?;
        Ok(hints.get(key).copied())
    }

    fn set_hint(&self, key: &str, next: u64) -> StorageResult<()> {
        let mut hints = self
            .next_block
            .lock()
            .map_err(|e| StorageError::Internal(format!("block hints poisoned: {}", e)))?;
        let entry = hints.entry(key.to_string()).or_insert(0);
        *entry = (*entry).max(next);
        Ok(())
    }
}

#[async_trait]
impl SegmentStore for ObjectSegmentStore {
    fn max_appends_per_segment(&self) -> u64 {
        self.max_appends_per_segment
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn create_container_if_absent(&self, container: &str) -> StorageResult<()> {
        let marker = Path::from_iter([container, CONTAINER_MARKER]);
        self.put_if_absent(&marker, Bytes::new()).await?;
        Ok(())
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn create_if_absent(
        &self,
        container: &str,
        segment: &str,
    ) -> StorageResult<CreateOutcome> {
        let container_marker = Path::from_iter([container, CONTAINER_MARKER]);
        if !self.exists(&container_marker).await? {
            return Err(StorageError::Storage(format!(
                "container '{}' not found",
                container
            )));
        }
        self.put_if_absent(&Self::segment_marker(container, segment), Bytes::new())
            .await
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn append_and_offset(
        &self,
        container: &str,
        segment: &str,
        payload: Bytes,
    ) -> StorageResult<AppendOutcome> {
        let key = Self::segment_prefix(container, segment).to_string();

        let mut index = match self.hint(&key)? {
            Some(next) => next,
            None => {
                if !self.exists(&Self::segment_marker(container, segment)).await? {
                    return Err(StorageError::Storage(format!(
                        "segment '{}' not found in container '{}'",
                        segment, container
                    )));
                }
                self.list_block_count(container, segment).await?
            }
        };

        loop {
            if index >= self.max_appends_per_segment {
                self.set_hint(&key, index)?;
                return Ok(AppendOutcome::Conflict);
            }

            let offset = match index {
                0 => 0,
                n => self.block_end(container, segment, n - 1).await?,
            };
            let block = Self::encode_block(offset, &payload);
            let path = Self::block_path(container, segment, index);

            match self.put_if_absent(&path, block).await? {
                CreateOutcome::Created => {
                    self.set_hint(&key, index + 1)?;
                    return Ok(AppendOutcome::Appended(offset));
                }
                CreateOutcome::AlreadyExists => index += 1,
            }
        }
    }

    #[tracing::instrument(level = "trace", skip_all)]
    async fn fetch_metadata(
        &self,
        container: &str,
        segment: &str,
    ) -> StorageResult<Option<SegmentMetadata>> {
        if !self.exists(&Self::segment_marker(container, segment)).await? {
            return Ok(None);
        }

        let key = Self::segment_prefix(container, segment).to_string();
        let committed_count = self.block_count(container, segment, &key).await?;
        let byte_length = match committed_count {
            0 => 0,
            n => self.block_end(container, segment, n - 1).await?,
        };
        Ok(Some(SegmentMetadata {
            committed_count,
            byte_length,
        }))
    }
}
