// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(not(feature = "std"), not(feature = "alloc")))]
compile_error!("veiltrack requires the `alloc` feature when built without `std`");

#[cfg(all(not(feature = "std"), feature = "alloc"))]
extern crate alloc;

pub mod errors;
/// Contiguous block runs.
pub mod extent;
/// Spare-capacity pools and the allocation cursor.
pub mod pool;
/// Resolved remap results and run coalescing.
pub mod remap;
/// The source-to-target block map.
pub mod table;
/// The copy-on-write tracker itself.
pub mod tracker;
/// Fixed-layout control-channel records.
pub mod wire;

pub mod prelude {
    pub use super::errors::*;
    pub use super::extent::Extent;
    pub use super::pool::{PoolChain, StoragePool};
    pub use super::remap::ExtentRemap;
    pub use super::table::RemapTable;
    pub use super::tracker::Tracker;
}
