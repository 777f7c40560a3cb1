//! Segment naming and chain probing.
//!
//! Segments of a chain are named `<base>.<suffix>`. [`segment_name`] is the
//! only place that builds those names; everything else addresses segments by
//! suffix.

use common::SegmentStore;

use crate::error::{Error, Result};
use crate::model::{SegmentInfo, SegmentSuffix};

/// Returns the backend name of segment `suffix` in the chain `base`.
pub(crate) fn segment_name(base: &str, suffix: SegmentSuffix) -> String {
    format!("{}.{}", base, suffix)
}

/// Checks that a container or stream name can be used to address segments.
pub(crate) fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::InvalidInput(format!("{} name is empty", kind)));
    }
    if name.contains('/') {
        return Err(Error::InvalidInput(format!(
            "{} name '{}' must not contain '/'",
            kind, name
        )));
    }
    Ok(())
}

/// Walks the chain from suffix 0 and returns every segment up to the first
/// missing one.
///
/// Each segment costs one metadata round-trip. The result is a best-effort
/// snapshot: appends and rollovers running concurrently may or may not be
/// reflected.
pub(crate) async fn probe_chain(
    store: &dyn SegmentStore,
    container: &str,
    base: &str,
) -> Result<Vec<SegmentInfo>> {
    let mut segments = Vec::new();
    let mut suffix: SegmentSuffix = 0;
    while let Some(meta) = store
        .fetch_metadata(container, &segment_name(base, suffix))
        .await?
    {
        segments.push(SegmentInfo {
            suffix,
            committed_count: meta.committed_count,
            byte_length: meta.byte_length,
        });
        suffix = suffix
            .checked_add(1)
            .ok_or_else(|| Error::Internal("segment suffix overflow".to_string()))?;
    }
    Ok(segments)
}
