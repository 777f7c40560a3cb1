//! The segment chain: one unbounded append-only stream over bounded segments.
//!
//! Appends go to the segment the cursor points at. When the store refuses an
//! append, the chain checks whether that segment is really full and, if so,
//! races every other writer to conditionally create the next segment. The
//! create is the only coordination point between writers: exactly one of them
//! creates the segment, the others see it already exists, and all of them
//! move on to it. No lock is held across a store call.

use std::sync::Arc;

use bytes::Bytes;
use common::storage::factory::create_store;
use common::{AppendOutcome, SegmentStore};

use crate::config::{AppendOptions, Config, RetryConfig};
use crate::cursor::ChainCursor;
use crate::encoding::TextEncoding;
use crate::error::{Error, Result};
use crate::model::{AppendResult, SegmentInfo, SegmentSuffix};
use crate::segment::{probe_chain, segment_name, validate_name};

/// An append-only stream split across capacity-bounded segments.
///
/// `SegmentChain` is designed to be shared across tasks behind an `Arc`. Any
/// number of chains, in this process or others, may append to the same
/// container and stream concurrently; they coordinate only through the store.
///
/// Capacity is discovered reactively. The chain never checks a segment's
/// committed count before appending; it relies on the store refusing the
/// append once the segment is full.
///
/// # Example
///
/// ```ignore
/// use std::sync::Arc;
/// use chain::SegmentChain;
/// use common::storage::in_memory::InMemorySegmentStore;
///
/// let store = Arc::new(InMemorySegmentStore::new());
/// let chain = SegmentChain::new(store, "container", "events").await?;
/// let result = chain.append_str("hello").await?;
/// println!("segment={} offset={}", result.suffix, result.offset);
/// ```
pub struct SegmentChain {
    store: Arc<dyn SegmentStore>,
    container: String,
    stream: String,
    cursor: ChainCursor,
    retry: RetryConfig,
}

impl SegmentChain {
    /// Opens a chain using the storage backend described by `config`.
    pub async fn open(config: Config) -> Result<Self> {
        let store = create_store(&config.storage).await?;
        Self::with_retry(store, config.container, config.stream, config.retry).await
    }

    /// Creates a chain over an existing store with the default retry policy.
    ///
    /// Provisions `container` if it does not exist yet.
    pub async fn new(
        store: Arc<dyn SegmentStore>,
        container: impl Into<String>,
        stream: impl Into<String>,
    ) -> Result<Self> {
        Self::with_retry(store, container, stream, RetryConfig::default()).await
    }

    /// Creates a chain over an existing store with a custom retry policy.
    pub async fn with_retry(
        store: Arc<dyn SegmentStore>,
        container: impl Into<String>,
        stream: impl Into<String>,
        retry: RetryConfig,
    ) -> Result<Self> {
        let container = container.into();
        let stream = stream.into();
        validate_name("container", &container)?;
        validate_name("stream", &stream)?;
        retry.validate()?;

        store.create_container_if_absent(&container).await?;
        tracing::info!(%container, %stream, "opened segment chain");

        Ok(Self {
            store,
            container,
            stream,
            cursor: ChainCursor::new(),
            retry,
        })
    }

    /// Returns the newest segment this process knows to exist.
    ///
    /// `None` until the first append. Other writers may have created newer
    /// segments.
    pub fn cursor(&self) -> Option<SegmentSuffix> {
        self.cursor.get()
    }

    /// Returns the backend name of segment `suffix` of this chain.
    pub fn segment_name(&self, suffix: SegmentSuffix) -> String {
        segment_name(&self.stream, suffix)
    }

    /// Appends a payload to the chain.
    ///
    /// Returns once some segment has accepted the payload. Store errors other
    /// than a refused append are returned as-is and not retried. Empty
    /// payloads are rejected: they would not occupy a position of their own.
    pub async fn append(&self, payload: impl Into<Bytes>) -> Result<AppendResult> {
        self.append_with_options(payload, AppendOptions::default())
            .await
    }

    /// Appends a payload to the chain, bounded by a deadline or cancellation token.
    pub async fn append_with_options(
        &self,
        payload: impl Into<Bytes>,
        options: AppendOptions,
    ) -> Result<AppendResult> {
        let payload = payload.into();
        if payload.is_empty() {
            return Err(Error::InvalidInput("payload is empty".to_string()));
        }
        let deadline = options.deadline.or(self.retry.deadline());

        let bounded = async move {
            match deadline {
                Some(deadline) => tokio::time::timeout(deadline, self.append_loop(payload))
                    .await
                    .unwrap_or(Err(Error::DeadlineExceeded(deadline))),
                None => self.append_loop(payload).await,
            }
        };

        match options.cancellation {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => Err(Error::Cancelled),
                    result = bounded => result,
                }
            }
            None => bounded.await,
        }
    }

    /// Appends UTF-8 encoded text to the chain.
    pub async fn append_str(&self, text: &str) -> Result<AppendResult> {
        self.append_str_with_encoding(text, TextEncoding::Utf8)
            .await
    }

    /// Appends text to the chain using the given encoding.
    pub async fn append_str_with_encoding(
        &self,
        text: &str,
        encoding: TextEncoding,
    ) -> Result<AppendResult> {
        self.append(encoding.encode(text)).await
    }

    /// Returns every segment from suffix 0 up to the first missing one.
    pub async fn list_segments(&self) -> Result<Vec<SegmentInfo>> {
        probe_chain(self.store.as_ref(), &self.container, &self.stream).await
    }

    /// Returns the total number of payload bytes across the chain.
    ///
    /// A point-in-time, best-effort value: concurrent appends may or may not
    /// be counted.
    pub async fn total_size(&self) -> Result<u64> {
        let segments = self.list_segments().await?;
        Ok(segments.iter().map(|s| s.byte_length).sum())
    }

    /// Returns the total number of accepted appends across the chain.
    ///
    /// Same consistency as [`total_size`](Self::total_size).
    pub async fn total_committed_count(&self) -> Result<u64> {
        let segments = self.list_segments().await?;
        Ok(segments.iter().map(|s| s.committed_count).sum())
    }

    async fn append_loop(&self, payload: Bytes) -> Result<AppendResult> {
        let mut attempts: u32 = 0;
        loop {
            // First touch of the stream from this process: materialize segment
            // 0 (or find it) before attempting any append.
            let Some(suffix) = self.cursor.get() else {
                self.ensure_next_segment().await?;
                continue;
            };

            attempts = attempts.saturating_add(1);
            let name = self.segment_name(suffix);
            let outcome = self
                .store
                .append_and_offset(&self.container, &name, payload.clone())
                .await?;

            match outcome {
                AppendOutcome::Appended(offset) => {
                    tracing::trace!(segment = %name, offset, attempts, "append accepted");
                    return Ok(AppendResult { suffix, offset });
                }
                AppendOutcome::Conflict => {
                    tracing::debug!(segment = %name, attempts, "append refused");
                    if self.retry.max_attempts.is_some_and(|max| attempts >= max) {
                        return Err(Error::RetriesExhausted { attempts });
                    }

                    self.ensure_next_segment().await?;

                    // Retry at once if the chain moved on. Otherwise the
                    // refusal was not about capacity; pause before hammering
                    // the same segment again.
                    let advanced = self.cursor.get().is_some_and(|active| active > suffix);
                    let backoff = self.retry.backoff();
                    if !advanced && !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
            }
        }
    }

    /// Makes sure a segment after the cursor exists when the cursor's segment is full.
    ///
    /// Returns without creating anything if the current segment still has
    /// room: a refused append does not by itself prove the segment is full.
    async fn ensure_next_segment(&self) -> Result<()> {
        let current = self.cursor.get();

        if let Some(current) = current {
            let name = self.segment_name(current);
            let capacity = self.store.max_appends_per_segment();
            match self.store.fetch_metadata(&self.container, &name).await? {
                Some(meta) if meta.committed_count < capacity => {
                    tracing::debug!(
                        segment = %name,
                        committed = meta.committed_count,
                        capacity,
                        "segment has room, no rollover needed"
                    );
                    return Ok(());
                }
                Some(_) => {}
                None => {
                    return Err(Error::Storage(format!(
                        "segment '{}' not found in container '{}'",
                        name, self.container
                    )));
                }
            }
        }

        let next = match current {
            Some(current) => current
                .checked_add(1)
                .ok_or_else(|| Error::Internal("segment suffix overflow".to_string()))?,
            None => 0,
        };
        let name = self.segment_name(next);
        // Created and AlreadyExists both mean the segment is there now,
        // whoever made it.
        let outcome = self.store.create_if_absent(&self.container, &name).await?;
        let active = self.cursor.raise_to(next);
        tracing::debug!(segment = %name, ?outcome, active, "rolled chain forward");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use common::storage::in_memory::InMemorySegmentStore;
    use common::{CreateOutcome, SegmentMetadata, StorageError, StorageResult};
    use rstest::rstest;
    use tokio_util::sync::CancellationToken;

    use super::*;

    const CONTAINER: &str = "container";
    const STREAM: &str = "stream";

    async fn chain_over(store: Arc<dyn SegmentStore>) -> SegmentChain {
        SegmentChain::new(store, CONTAINER, STREAM).await.unwrap()
    }

    /// Wraps an in-memory store and counts create outcomes.
    struct RecordingStore {
        inner: InMemorySegmentStore,
        created: AtomicUsize,
        already_exists: AtomicUsize,
    }

    impl RecordingStore {
        fn with_max_appends(max_appends: u64) -> Self {
            Self {
                inner: InMemorySegmentStore::with_max_appends(max_appends),
                created: AtomicUsize::new(0),
                already_exists: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SegmentStore for RecordingStore {
        fn max_appends_per_segment(&self) -> u64 {
            self.inner.max_appends_per_segment()
        }

        async fn create_container_if_absent(&self, container: &str) -> StorageResult<()> {
            self.inner.create_container_if_absent(container).await
        }

        async fn create_if_absent(
            &self,
            container: &str,
            segment: &str,
        ) -> StorageResult<CreateOutcome> {
            let outcome = self.inner.create_if_absent(container, segment).await?;
            match outcome {
                CreateOutcome::Created => self.created.fetch_add(1, Ordering::SeqCst),
                CreateOutcome::AlreadyExists => self.already_exists.fetch_add(1, Ordering::SeqCst),
            };
            Ok(outcome)
        }

        async fn append_and_offset(
            &self,
            container: &str,
            segment: &str,
            payload: Bytes,
        ) -> StorageResult<AppendOutcome> {
            self.inner
                .append_and_offset(container, segment, payload)
                .await
        }

        async fn fetch_metadata(
            &self,
            container: &str,
            segment: &str,
        ) -> StorageResult<Option<SegmentMetadata>> {
            self.inner.fetch_metadata(container, segment).await
        }
    }

    /// Refuses every append while reporting segments as empty.
    struct RefusingStore {
        inner: InMemorySegmentStore,
        /// Only refuse the first append when set.
        once: bool,
        refused: AtomicBool,
        appends: AtomicUsize,
    }

    impl RefusingStore {
        fn new(once: bool) -> Self {
            Self {
                inner: InMemorySegmentStore::new(),
                once,
                refused: AtomicBool::new(false),
                appends: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SegmentStore for RefusingStore {
        fn max_appends_per_segment(&self) -> u64 {
            self.inner.max_appends_per_segment()
        }

        async fn create_container_if_absent(&self, container: &str) -> StorageResult<()> {
            self.inner.create_container_if_absent(container).await
        }

        async fn create_if_absent(
            &self,
            container: &str,
            segment: &str,
        ) -> StorageResult<CreateOutcome> {
            self.inner.create_if_absent(container, segment).await
        }

        async fn append_and_offset(
            &self,
            container: &str,
            segment: &str,
            payload: Bytes,
        ) -> StorageResult<AppendOutcome> {
            self.appends.fetch_add(1, Ordering::SeqCst);
            if !self.once || !self.refused.swap(true, Ordering::SeqCst) {
                return Ok(AppendOutcome::Conflict);
            }
            self.inner
                .append_and_offset(container, segment, payload)
                .await
        }

        async fn fetch_metadata(
            &self,
            container: &str,
            segment: &str,
        ) -> StorageResult<Option<SegmentMetadata>> {
            self.inner.fetch_metadata(container, segment).await
        }
    }

    /// Fails every append with a backend error.
    struct FailingStore {
        inner: InMemorySegmentStore,
    }

    #[async_trait]
    impl SegmentStore for FailingStore {
        fn max_appends_per_segment(&self) -> u64 {
            self.inner.max_appends_per_segment()
        }

        async fn create_container_if_absent(&self, container: &str) -> StorageResult<()> {
            self.inner.create_container_if_absent(container).await
        }

        async fn create_if_absent(
            &self,
            container: &str,
            segment: &str,
        ) -> StorageResult<CreateOutcome> {
            self.inner.create_if_absent(container, segment).await
        }

        async fn append_and_offset(
            &self,
            _container: &str,
            _segment: &str,
            _payload: Bytes,
        ) -> StorageResult<AppendOutcome> {
            Err(StorageError::Storage("connection reset".to_string()))
        }

        async fn fetch_metadata(
            &self,
            container: &str,
            segment: &str,
        ) -> StorageResult<Option<SegmentMetadata>> {
            self.inner.fetch_metadata(container, segment).await
        }
    }

    #[tokio::test]
    async fn should_provision_container_on_new() {
        // given
        let store = Arc::new(InMemorySegmentStore::new());

        // when
        let _chain = chain_over(store.clone()).await;

        // then: segments can be created in the container right away
        let outcome = store.create_if_absent(CONTAINER, "other.0").await;
        assert_eq!(outcome, Ok(CreateOutcome::Created));
    }

    #[tokio::test]
    async fn should_reject_invalid_stream_name() {
        // given
        let store = Arc::new(InMemorySegmentStore::new());

        // when
        let result = SegmentChain::new(store, CONTAINER, "a/b").await;

        // then
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }

    #[tokio::test]
    async fn should_create_first_segment_on_first_append() {
        // given
        let store = Arc::new(InMemorySegmentStore::new());
        let chain = chain_over(store.clone()).await;
        assert_eq!(chain.cursor(), None);

        // when
        let result = chain.append(Bytes::from("hello")).await.unwrap();

        // then
        assert_eq!(result, AppendResult { suffix: 0, offset: 0 });
        assert_eq!(chain.cursor(), Some(0));
        assert_eq!(
            store.segment_names(CONTAINER).unwrap(),
            vec!["stream.0".to_string()]
        );
    }

    #[tokio::test]
    async fn should_roll_over_when_segment_full() {
        // given
        let store = Arc::new(InMemorySegmentStore::with_max_appends(2));
        let chain = chain_over(store.clone()).await;

        // when
        let a = chain.append_str("a").await.unwrap();
        let b = chain.append_str("b").await.unwrap();
        let c = chain.append_str("c").await.unwrap();

        // then
        assert_eq!(a, AppendResult { suffix: 0, offset: 0 });
        assert_eq!(b, AppendResult { suffix: 0, offset: 1 });
        assert_eq!(c, AppendResult { suffix: 1, offset: 0 });
        assert_eq!(chain.total_committed_count().await.unwrap(), 3);
        assert_eq!(
            store.contents(CONTAINER, "stream.0").unwrap(),
            Some(Bytes::from("ab"))
        );
        assert_eq!(
            store.contents(CONTAINER, "stream.1").unwrap(),
            Some(Bytes::from("c"))
        );
    }

    #[rstest]
    #[case::capacity_one(1)]
    #[case::capacity_three(3)]
    #[case::capacity_ten(10)]
    #[tokio::test]
    async fn should_split_at_capacity_boundary(#[case] capacity: u64) {
        // given
        let store = Arc::new(InMemorySegmentStore::with_max_appends(capacity));
        let chain = chain_over(store).await;

        // when
        let mut results = Vec::new();
        for _ in 0..=capacity {
            results.push(chain.append(Bytes::from_static(b"x")).await.unwrap());
        }

        // then
        let expected: Vec<_> = (0..capacity)
            .map(|offset| AppendResult { suffix: 0, offset })
            .chain(std::iter::once(AppendResult { suffix: 1, offset: 0 }))
            .collect();
        assert_eq!(results, expected);
    }

    #[tokio::test]
    async fn should_aggregate_size_and_count_across_segments() {
        // given: segment 0 full at 50000 one-byte appends, segment 1 with 10
        let store = Arc::new(InMemorySegmentStore::new());
        let chain = chain_over(store.clone()).await;
        store.create_if_absent(CONTAINER, "stream.0").await.unwrap();
        store.create_if_absent(CONTAINER, "stream.1").await.unwrap();
        for _ in 0..50_000 {
            store
                .append_and_offset(CONTAINER, "stream.0", Bytes::from_static(b"x"))
                .await
                .unwrap();
        }
        for _ in 0..10 {
            store
                .append_and_offset(CONTAINER, "stream.1", Bytes::from_static(b"y"))
                .await
                .unwrap();
        }

        // when
        let count = chain.total_committed_count().await.unwrap();
        let size = chain.total_size().await.unwrap();

        // then
        assert_eq!(count, 50_010);
        assert_eq!(size, 50_010);
    }

    #[tokio::test]
    async fn should_report_zero_totals_for_untouched_chain() {
        // given
        let store = Arc::new(InMemorySegmentStore::new());
        let chain = chain_over(store).await;

        // when
        let segments = chain.list_segments().await.unwrap();

        // then
        assert!(segments.is_empty());
        assert_eq!(chain.total_size().await.unwrap(), 0);
        assert_eq!(chain.total_committed_count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn should_list_segments_in_suffix_order() {
        // given
        let store = Arc::new(InMemorySegmentStore::with_max_appends(2));
        let chain = chain_over(store).await;
        for payload in ["aa", "b", "ccc", "d", "ee"] {
            chain.append_str(payload).await.unwrap();
        }

        // when
        let segments = chain.list_segments().await.unwrap();

        // then
        assert_eq!(
            segments,
            vec![
                SegmentInfo {
                    suffix: 0,
                    committed_count: 2,
                    byte_length: 3,
                },
                SegmentInfo {
                    suffix: 1,
                    committed_count: 2,
                    byte_length: 4,
                },
                SegmentInfo {
                    suffix: 2,
                    committed_count: 1,
                    byte_length: 2,
                },
            ]
        );
    }

    #[tokio::test]
    async fn should_find_existing_segments_after_restart() {
        // given: a previous writer filled segment 0 and started segment 1
        let store = Arc::new(InMemorySegmentStore::with_max_appends(2));
        let previous = chain_over(store.clone()).await;
        for payload in ["a", "b", "c"] {
            previous.append_str(payload).await.unwrap();
        }

        // when: a fresh chain appends to the same stream
        let restarted = chain_over(store.clone()).await;
        let result = restarted.append_str("d").await.unwrap();

        // then: it walks forward to segment 1 without creating anything new
        assert_eq!(result, AppendResult { suffix: 1, offset: 1 });
        assert_eq!(restarted.cursor(), Some(1));
        assert_eq!(store.segment_names(CONTAINER).unwrap().len(), 2);
    }

    #[tokio::test]
    async fn should_share_chain_between_independent_writers() {
        // given: two chain instances, as two processes would have
        let store = Arc::new(InMemorySegmentStore::with_max_appends(2));
        let first = chain_over(store.clone()).await;
        let second = chain_over(store.clone()).await;

        // when
        let a = first.append_str("a").await.unwrap();
        let b = second.append_str("b").await.unwrap();
        let c = first.append_str("c").await.unwrap();
        let d = second.append_str("d").await.unwrap();

        // then
        assert_eq!(a, AppendResult { suffix: 0, offset: 0 });
        assert_eq!(b, AppendResult { suffix: 0, offset: 1 });
        assert_eq!(c, AppendResult { suffix: 1, offset: 0 });
        assert_eq!(d, AppendResult { suffix: 1, offset: 1 });
        assert_eq!(first.total_committed_count().await.unwrap(), 4);
    }

    #[tokio::test]
    async fn should_not_roll_over_on_refusal_below_capacity() {
        // given: the store refuses one append even though segment 0 is empty
        let store = Arc::new(RefusingStore::new(true));
        let chain = chain_over(store.clone()).await;

        // when
        let result = chain.append_str("a").await.unwrap();

        // then: the retry lands in segment 0 and no segment 1 was created
        assert_eq!(result, AppendResult { suffix: 0, offset: 0 });
        assert_eq!(store.appends.load(Ordering::SeqCst), 2);
        assert_eq!(
            store.inner.segment_names(CONTAINER).unwrap(),
            vec!["stream.0".to_string()]
        );
    }

    #[tokio::test]
    async fn should_give_up_after_max_attempts() {
        // given
        let store = Arc::new(RefusingStore::new(false));
        let retry = RetryConfig {
            max_attempts: Some(3),
            backoff_ms: 0,
            deadline_ms: None,
        };
        let chain = SegmentChain::with_retry(store.clone(), CONTAINER, STREAM, retry)
            .await
            .unwrap();

        // when
        let result = chain.append_str("a").await;

        // then
        assert_eq!(result, Err(Error::RetriesExhausted { attempts: 3 }));
        assert_eq!(store.appends.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn should_stop_at_deadline() {
        // given
        let store = Arc::new(RefusingStore::new(false));
        let chain = chain_over(store).await;
        let options = AppendOptions {
            deadline: Some(Duration::from_millis(20)),
            ..Default::default()
        };

        // when
        let result = chain.append_with_options("a", options).await;

        // then
        assert_eq!(
            result,
            Err(Error::DeadlineExceeded(Duration::from_millis(20)))
        );
    }

    #[tokio::test]
    async fn should_stop_when_cancelled() {
        // given
        let store = Arc::new(RefusingStore::new(false));
        let chain = chain_over(store).await;
        let token = CancellationToken::new();
        token.cancel();
        let options = AppendOptions {
            cancellation: Some(token),
            ..Default::default()
        };

        // when
        let result = chain.append_with_options("a", options).await;

        // then
        assert_eq!(result, Err(Error::Cancelled));
    }

    #[tokio::test]
    async fn should_propagate_backend_errors_without_retry() {
        // given
        let store = Arc::new(FailingStore {
            inner: InMemorySegmentStore::new(),
        });
        let chain = chain_over(store).await;

        // when
        let result = chain.append_str("a").await;

        // then
        assert_eq!(
            result,
            Err(Error::Storage("connection reset".to_string()))
        );
    }

    #[tokio::test]
    async fn should_encode_text_before_append() {
        // given
        let store = Arc::new(InMemorySegmentStore::new());
        let chain = chain_over(store.clone()).await;

        // when
        chain
            .append_str_with_encoding("hi", TextEncoding::Utf16Be)
            .await
            .unwrap();
        let next = chain.append_str("!").await.unwrap();

        // then
        assert_eq!(next, AppendResult { suffix: 0, offset: 4 });
        assert_eq!(
            store.contents(CONTAINER, "stream.0").unwrap(),
            Some(Bytes::from_static(&[0x00, b'h', 0x00, b'i', b'!']))
        );
    }

    #[tokio::test]
    async fn should_reject_empty_payload() {
        // given
        let store = Arc::new(InMemorySegmentStore::new());
        let chain = chain_over(store.clone()).await;

        // when
        let text = chain.append_str("").await;
        let bytes = chain.append(Vec::<u8>::new()).await;
        let utf16 = chain
            .append_str_with_encoding("", TextEncoding::Utf16Le)
            .await;
        let next = chain.append_str("a").await.unwrap();

        // then
        assert!(matches!(text, Err(Error::InvalidInput(_))));
        assert!(matches!(bytes, Err(Error::InvalidInput(_))));
        assert!(matches!(utf16, Err(Error::InvalidInput(_))));
        assert_eq!(next, AppendResult { suffix: 0, offset: 0 });
        assert_eq!(chain.total_committed_count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn should_treat_existing_segment_as_created_across_instances() {
        // given: one chain instance per writer, all sharing the store
        const INSTANCES: u64 = 4;
        let store = Arc::new(RecordingStore::with_max_appends(INSTANCES));
        let mut chains = Vec::new();
        for _ in 0..INSTANCES {
            chains.push(Arc::new(chain_over(store.clone()).await));
        }
        for chain in &chains {
            chain.append_str("x").await.unwrap();
        }
        assert_eq!(store.created.load(Ordering::SeqCst), 1);
        assert_eq!(
            store.already_exists.load(Ordering::SeqCst) as u64,
            INSTANCES - 1
        );

        // when: every instance finds segment 0 full and races to create segment 1
        let handles: Vec<_> = chains
            .iter()
            .map(|chain| {
                let chain = Arc::clone(chain);
                tokio::spawn(async move { chain.append_str("y").await })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        // then: one create won and every other instance saw the segment as existing
        assert_eq!(store.created.load(Ordering::SeqCst), 2);
        assert_eq!(
            store.already_exists.load(Ordering::SeqCst) as u64,
            2 * (INSTANCES - 1)
        );
        assert!(results.iter().all(|r| r.suffix == 1));
        for chain in &chains {
            assert_eq!(chain.cursor(), Some(1));
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn should_create_next_segment_once_under_contention() {
        // given: segment 0 is full
        const WRITERS: u64 = 8;
        let store = Arc::new(RecordingStore::with_max_appends(WRITERS));
        let chain = Arc::new(chain_over(store.clone()).await);
        for _ in 0..WRITERS {
            chain.append_str("x").await.unwrap();
        }
        assert_eq!(store.created.load(Ordering::SeqCst), 1);

        // when: every writer hits the full segment and races the rollover
        let handles: Vec<_> = (0..WRITERS)
            .map(|_| {
                let chain = Arc::clone(&chain);
                tokio::spawn(async move { chain.append_str("y").await })
            })
            .collect();
        let mut results = Vec::new();
        for handle in handles {
            results.push(handle.await.unwrap().unwrap());
        }

        // then: one segment was created and every writer landed in it
        assert_eq!(store.created.load(Ordering::SeqCst), 2);
        assert!(results.iter().all(|r| r.suffix == 1));
        let offsets: HashSet<_> = results.iter().map(|r| r.offset).collect();
        assert_eq!(offsets.len() as u64, WRITERS);
        assert_eq!(
            store.inner.segment_names(CONTAINER).unwrap(),
            vec!["stream.0".to_string(), "stream.1".to_string()]
        );
    }
}
