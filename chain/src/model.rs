//! Core data types for segment chains.

/// Position of a segment within its chain.
///
/// Suffixes start at 0 and form a gap-free prefix of the naturals: segment
/// `n + 1` only exists if segment `n` does.
pub type SegmentSuffix = u32;

/// Where an appended payload landed.
///
/// No two successful appends to the same chain share a `(suffix, offset)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AppendResult {
    /// The segment that accepted the payload.
    pub suffix: SegmentSuffix,
    /// Byte offset of the payload within that segment.
    pub offset: u64,
}

/// Point-in-time view of one segment of the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentInfo {
    pub suffix: SegmentSuffix,
    /// Appends the segment has accepted.
    pub committed_count: u64,
    /// Payload bytes stored in the segment.
    pub byte_length: u64,
}
