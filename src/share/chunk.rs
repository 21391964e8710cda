//! Splitting an upload into range writes

use std::fmt;
use std::num::NonZeroU64;

/// Half-open byte span `[start, end)` of a file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ByteRange {
    pub start: u64,
    pub end: u64,
}

impl ByteRange {
    pub fn new(start: u64, end: u64) -> Self {
        Self { start, end }
    }

    pub fn len(&self) -> u64 {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Value of the inclusive `x-ms-range` header, `bytes=<start>-<end-1>`
    pub fn header_value(&self) -> String {
        format!("bytes={}-{}", self.start, self.end.saturating_sub(1))
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}:{}]", self.start, self.end)
    }
}

/// Partition `total_size` bytes into contiguous ranges of at most `max_chunk`.
///
/// Ranges start at every multiple of `max_chunk` below `total_size`; the last
/// one ends at `total_size`. An empty file yields the single range `(0, 0)`.
pub fn plan(total_size: u64, max_chunk: NonZeroU64) -> Vec<ByteRange> {
    if total_size == 0 {
        return vec![ByteRange::new(0, 0)];
    }

    let step = max_chunk.get();
    let mut ranges = Vec::with_capacity(total_size.div_ceil(step) as usize);
    let mut start = 0;
    while start < total_size {
        let end = start.saturating_add(step).min(total_size);
        ranges.push(ByteRange::new(start, end));
        start = end;
    }
    ranges
}
