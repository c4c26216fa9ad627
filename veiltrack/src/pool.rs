// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::{string::String, vec, vec::Vec};

use log::debug;

use crate::errors::*;
use crate::extent::Extent;

/// One contiguous grant of spare storage: an ordered set of extents, usually
/// the physical runs backing a single pre-allocated file.
#[derive(Debug, Clone)]
pub struct StoragePool {
    extents: Vec<Extent>,
    total_blocks: u64,
    label: Option<String>,
}

impl StoragePool {
    /// Builds a pool from its extent list.
    ///
    /// The list must be non-empty and every extent must cover at least one
    /// block; the pool's block count is derived from the list.
    pub fn new(extents: Vec<Extent>) -> TrackResult<Self> {
        if extents.is_empty() {
            return Err(TrackError::Invalid("pool has no extents"));
        }
        if extents.iter().any(Extent::is_empty) {
            return Err(TrackError::Invalid("pool extent covers no blocks"));
        }
        let total_blocks = extents.iter().map(|e| e.length_in_blocks as u64).sum();
        Ok(Self {
            extents,
            total_blocks,
            label: None,
        })
    }

    /// Attaches a human-readable origin, e.g. the backing file name.
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    #[inline]
    pub fn extents(&self) -> &[Extent] {
        &self.extents
    }

    #[inline]
    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    #[inline]
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }
}

/// Allocation cursor: the next free location inside the chain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Cursor {
    pool: usize,
    extent: usize,
    offset: u32,
}

/// Ordered chain of storage pools with a monotonic allocation cursor.
///
/// Target blocks are handed out sequentially: within an extent, then across
/// the pool's extents, then across pools. Nothing is ever handed out twice
/// until the chain is rewound.
#[derive(Debug)]
pub struct PoolChain {
    pools: Vec<StoragePool>,
    cursor: Cursor,
    total_blocks: u64,
    free_blocks: u64,
}

impl PoolChain {
    pub fn new(initial: StoragePool) -> Self {
        let total_blocks = initial.total_blocks();
        Self {
            pools: vec![initial],
            cursor: Cursor::default(),
            total_blocks,
            free_blocks: total_blocks,
        }
    }

    /// Appends a pool at the tail of the chain, growing capacity without
    /// disturbing the cursor or any handed-out block.
    pub fn add(&mut self, pool: StoragePool) {
        debug!(
            "adding pool of {} blocks ({} extents)",
            pool.total_blocks(),
            pool.extents().len()
        );
        self.total_blocks += pool.total_blocks();
        self.free_blocks += pool.total_blocks();
        self.pools.push(pool);
    }

    /// Drops every pool and installs `pool` as the sole chain member.
    pub fn replace(&mut self, pool: StoragePool) {
        self.pools.clear();
        self.total_blocks = pool.total_blocks();
        self.pools.push(pool);
        self.rewind();
    }

    /// Rewinds the cursor to the head of the chain and marks every block
    /// free again. Pools themselves are untouched.
    pub fn rewind(&mut self) {
        self.cursor = Cursor::default();
        self.free_blocks = self.total_blocks;
    }

    #[inline]
    pub fn pools(&self) -> &[StoragePool] {
        &self.pools
    }

    #[inline]
    pub fn total_blocks(&self) -> u64 {
        self.total_blocks
    }

    /// Blocks not yet handed out.
    ///
    /// An upper bound once [`Self::skip_to_next_pool`] has stranded capacity:
    /// bypassed blocks stay counted even though the cursor will never reach
    /// them again.
    #[inline]
    pub fn free_blocks(&self) -> u64 {
        self.free_blocks
    }

    /// Whether a pool exists past the one the cursor sits in.
    #[inline]
    pub fn has_next_pool(&self) -> bool {
        self.cursor.pool + 1 < self.pools.len()
    }

    /// Moves the cursor wholesale to the start of the next pool.
    ///
    /// Any unallocated blocks left in the current pool are stranded: they
    /// remain counted by [`Self::free_blocks`] but will never be handed out.
    pub fn skip_to_next_pool(&mut self) -> TrackResult {
        if !self.has_next_pool() {
            debug!("no pool to skip to, chain exhausted");
            return Err(TrackError::NoStorage);
        }
        self.cursor = Cursor {
            pool: self.cursor.pool + 1,
            extent: 0,
            offset: 0,
        };
        debug!("cursor skipped to pool {}", self.cursor.pool);
        Ok(())
    }

    /// Hands out the next free target block and advances the cursor,
    /// stepping to the next extent and the next pool as each is consumed.
    pub fn allocate_next(&mut self) -> TrackResult<u64> {
        let pool = self
            .pools
            .get(self.cursor.pool)
            .ok_or(TrackError::NoStorage)?;
        let extent = pool.extents()[self.cursor.extent];
        let target = extent.start_block + self.cursor.offset as u64;

        self.cursor.offset += 1;
        self.free_blocks = self.free_blocks.saturating_sub(1);
        if self.cursor.offset == extent.length_in_blocks {
            self.cursor.extent += 1;
            self.cursor.offset = 0;
            if self.cursor.extent == pool.extents().len() {
                self.cursor.pool += 1;
                self.cursor.extent = 0;
            }
        }
        Ok(target)
    }
}
