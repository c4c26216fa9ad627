// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{boxed::Box, vec::Vec};

use core::fmt;

use crate::errors::*;
use crate::extent::Extent;

/// Resolution of one source extent into target-space runs.
///
/// Each run is either a redirected range (target blocks) or a pass-through
/// range (the original block numbers, for blocks never redirected). Runs are
/// ordered to cover the source extent front to back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtentRemap {
    source: Extent,
    num_remapped: u32,
    extents: Box<[Extent]>,
}

impl ExtentRemap {
    pub(crate) fn new(source: Extent, num_remapped: u32, extents: Box<[Extent]>) -> Self {
        Self {
            source,
            num_remapped,
            extents,
        }
    }

    /// The queried source extent.
    #[inline]
    pub fn source(&self) -> Extent {
        self.source
    }

    /// How many blocks of the source range were redirected.
    #[inline]
    pub fn num_remapped(&self) -> u32 {
        self.num_remapped
    }

    #[inline]
    pub fn number_of_extents(&self) -> u32 {
        self.extents.len() as u32
    }

    /// The resolved runs, in source order.
    #[inline]
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }
}

impl fmt::Display for ExtentRemap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> ", self.source)?;
        for (i, e) in self.extents.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{e}")?;
        }
        write!(f, " ({} redirected)", self.num_remapped)
    }
}

/// Counts the runs [`coalesce`] will produce for `blocks`.
fn count_runs(blocks: &[u64]) -> usize {
    let mut runs = 1;
    for i in 1..blocks.len() {
        if blocks[i] != blocks[i - 1] + 1 {
            runs += 1;
        }
    }
    runs
}

/// Run-length encodes an array of resolved block values into maximal runs of
/// consecutive values.
///
/// Contiguity is judged on the VALUES: a source-contiguous range redirected
/// to scattered targets splits, and pass-through values (which are literal
/// source numbers) merge back into single runs on their own. The run count is
/// taken in a first pass so the result buffer is allocated once, at its exact
/// final size.
pub(crate) fn coalesce(blocks: &[u64]) -> TrackResult<Box<[Extent]>> {
    debug_assert!(!blocks.is_empty());

    let mut out = Vec::new();
    out.try_reserve_exact(count_runs(blocks))?;

    let mut run = Extent::new(blocks[0], 1);
    for i in 1..blocks.len() {
        if blocks[i] == blocks[i - 1] + 1 {
            run.length_in_blocks += 1;
        } else {
            out.push(run);
            run = Extent::new(blocks[i], 1);
        }
    }
    out.push(run);
    Ok(out.into_boxed_slice())
}
