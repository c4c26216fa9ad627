// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use log::{debug, trace};

use crate::errors::*;
use crate::extent::Extent;
use crate::pool::{PoolChain, StoragePool};
use crate::remap::{ExtentRemap, coalesce};
use crate::table::RemapTable;

/// Copy-on-write block tracker.
///
/// Owns the spare-storage pool chain and the source-to-target remap table.
/// Writes go through [`Tracker::remap`], which redirects every block of the
/// range to spare storage; reads go through [`Tracker::find_remap`], which
/// resolves redirected blocks and passes the rest through untouched.
///
/// The tracker performs no synchronization of its own: every mutating
/// operation takes `&mut self`, so exclusive ownership is the serialization
/// discipline.
#[derive(Debug)]
pub struct Tracker {
    chain: PoolChain,
    table: RemapTable,
}

impl Tracker {
    /// Creates a tracker drawing target blocks from `initial`.
    pub fn new(initial: StoragePool) -> Self {
        Self {
            chain: PoolChain::new(initial),
            table: RemapTable::new(),
        }
    }

    /// Appends spare capacity without disturbing existing mappings.
    pub fn add_storage(&mut self, pool: StoragePool) {
        self.chain.add(pool);
    }

    /// Discards every mapping and rewinds allocation to the head of the
    /// chain. Pools are kept; all capacity is free again afterwards.
    pub fn reset(&mut self) {
        debug!("reset: dropping {} mappings", self.table.len());
        self.table.clear();
        self.chain.rewind();
    }

    /// Discards every mapping AND the current pools, installing `pool` as
    /// the sole source of spare capacity.
    pub fn reset_storage(&mut self, pool: StoragePool) {
        debug!(
            "reset_storage: dropping {} mappings and {} pools",
            self.table.len(),
            self.chain.pools().len()
        );
        self.table.clear();
        self.chain.replace(pool);
    }

    /// Write path: ensures every block of `source` has a target, allocating
    /// from the pool chain for blocks seen for the first time, then resolves
    /// the range like [`Tracker::find_remap`].
    ///
    /// When the counted free capacity cannot cover the whole range, the
    /// allocation cursor jumps to the next pool (stranding whatever was left
    /// in the current one) or the call fails with [`TrackError::NoStorage`]
    /// before touching the table. If the chain runs dry mid-range instead,
    /// the call also fails with `NoStorage`, but mappings created for the
    /// blocks processed before the failure are kept.
    pub fn remap(&mut self, source: Extent) -> TrackResult<ExtentRemap> {
        if source.is_empty() {
            return Err(TrackError::Invalid("source extent covers no blocks"));
        }
        trace!("remap {source}");

        if self.chain.free_blocks() < source.length_in_blocks as u64 {
            self.chain.skip_to_next_pool()?;
        }

        for block in source.blocks() {
            if self.table.get(block).is_none() {
                let target = self.chain.allocate_next()?;
                self.table.insert(block, target);
            }
        }
        self.find_remap(source)
    }

    /// Read path: resolves `source` against the table without allocating.
    /// Blocks never redirected resolve to themselves.
    pub fn find_remap(&self, source: Extent) -> TrackResult<ExtentRemap> {
        if source.is_empty() {
            return Err(TrackError::Invalid("source extent covers no blocks"));
        }

        let mut blocks = Vec::new();
        blocks.try_reserve_exact(source.length_in_blocks as usize)?;

        let mut num_remapped = 0u32;
        for block in source.blocks() {
            match self.table.get(block) {
                Some(target) => {
                    blocks.push(target);
                    num_remapped += 1;
                }
                None => blocks.push(block),
            }
        }

        let extents = coalesce(&blocks)?;
        let result = ExtentRemap::new(source, num_remapped, extents);
        trace!("resolved {result}");
        Ok(result)
    }

    /// Single-block probe: the target block if `block` is redirected.
    #[inline]
    pub fn find_remap_for_block(&self, block: u64) -> Option<u64> {
        self.table.get(block)
    }

    /// Dumps every redirected block, coalesced into maximal runs of
    /// contiguous SOURCE blocks, each re-resolved into its target-side
    /// breakdown.
    ///
    /// Fails with [`TrackError::Invalid`] when nothing is redirected; gate
    /// calls on [`Tracker::remapped_blocks`].
    pub fn all_remaps(&self) -> TrackResult<Vec<ExtentRemap>> {
        if self.table.is_empty() {
            return Err(TrackError::Invalid("no blocks are redirected"));
        }

        let keys = self.table.sorted_sources()?;
        let sources = coalesce(&keys)?;

        let mut out = Vec::new();
        out.try_reserve_exact(sources.len())?;
        for source in &sources {
            out.push(self.find_remap(*source)?);
        }
        Ok(out)
    }

    /// `(total_blocks, free_blocks)` across the whole chain.
    #[inline]
    pub fn storage_info(&self) -> (u64, u64) {
        (self.chain.total_blocks(), self.chain.free_blocks())
    }

    /// Number of redirected blocks.
    #[inline]
    pub fn remapped_blocks(&self) -> usize {
        self.table.len()
    }

    #[inline]
    pub fn pools(&self) -> &[StoragePool] {
        self.chain.pools()
    }
}
