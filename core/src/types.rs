//! Shared primitive types used across the entire simulation.

/// A simulation month. Month 0 is the seed state of a run.
pub type Month = u64;

/// The canonical run identifier (UUID v4 when persisted).
pub type RunId = String;

/// Number of customer segments tracked by the model.
pub const SEGMENT_COUNT: usize = 5;

/// Number of non-terminal segments.
pub const ACTIVE_SEGMENT_COUNT: usize = 4;

/// Integer customer counts, one per segment, in `Segment::ALL` order.
pub type SegmentCounts = [i64; SEGMENT_COUNT];

/// A probability vector over segments, in `Segment::ALL` order.
pub type Distribution = [f64; SEGMENT_COUNT];
