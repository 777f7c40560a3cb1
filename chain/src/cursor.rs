//! Process-local hint for the newest segment of a chain.

use std::sync::atomic::{AtomicI64, Ordering};

use crate::model::SegmentSuffix;

const UNKNOWN: i64 = -1;

/// Lower bound on the highest segment suffix known to exist.
///
/// Shared by every caller of a [`SegmentChain`](crate::SegmentChain) in this
/// process. The store stays authoritative: other processes may have created
/// newer segments that this cursor has not seen. The value only ever moves
/// forward.
#[derive(Debug)]
pub(crate) struct ChainCursor {
    active: AtomicI64,
}

impl ChainCursor {
    /// Creates a cursor that has not seen any segment yet.
    pub(crate) fn new() -> Self {
        Self {
            active: AtomicI64::new(UNKNOWN),
        }
    }

    /// Returns the newest known suffix, or `None` before the first segment was seen.
    pub(crate) fn get(&self) -> Option<SegmentSuffix> {
        let active = self.active.load(Ordering::Acquire);
        if active < 0 {
            None
        } else {
            Some(active as SegmentSuffix)
        }
    }

    /// Raises the cursor to at least `suffix` and returns the resulting value.
    pub(crate) fn raise_to(&self, suffix: SegmentSuffix) -> SegmentSuffix {
        let target = i64::from(suffix);
        let previous = self.active.fetch_max(target, Ordering::AcqRel);
        previous.max(target) as SegmentSuffix
    }
}
