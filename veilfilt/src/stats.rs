// SPDX-License-Identifier: MIT

/// Per-session filter counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug)]
pub struct FilterStats {
    /// Tracked read requests.
    pub reads: u64,
    /// Tracked write requests.
    pub writes: u64,
    /// Blocks resolved to spare storage on the read path.
    pub read_hits: u64,
    /// Blocks resolved to spare storage on the write path.
    pub write_hits: u64,
}

impl FilterStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = FilterStats::default();
    }
}

/// Snapshot of a filter's tracking state and capacity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FilterInfo {
    pub tracking: bool,
    pub remapped_blocks: u64,
    pub total_blocks: u64,
    pub free_blocks: u64,
}
