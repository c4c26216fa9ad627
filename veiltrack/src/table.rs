// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use hashbrown::HashMap;

use crate::errors::*;

/// Point-lookup map from source block to allocated target block.
///
/// The unit of truth for "has this block been redirected". Keys are unique;
/// the table only ever shrinks through [`Self::clear`].
#[derive(Debug, Default)]
pub struct RemapTable {
    map: HashMap<u64, u64>,
}

impl RemapTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of redirected blocks.
    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Records `source -> target`. A source block is only ever inserted once.
    #[inline]
    pub fn insert(&mut self, source: u64, target: u64) {
        let prev = self.map.insert(source, target);
        debug_assert!(prev.is_none(), "source block remapped twice");
    }

    #[inline]
    pub fn get(&self, source: u64) -> Option<u64> {
        self.map.get(&source).copied()
    }

    /// Drops every mapping.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// All source blocks, ascending.
    pub fn sorted_sources(&self) -> TrackResult<Vec<u64>> {
        let mut keys = Vec::new();
        keys.try_reserve_exact(self.map.len())?;
        keys.extend(self.map.keys().copied());
        keys.sort_unstable();
        Ok(keys)
    }
}
