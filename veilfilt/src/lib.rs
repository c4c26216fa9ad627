// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

#[cfg(all(not(feature = "std"), not(feature = "alloc")))]
compile_error!("veilfilt requires the `alloc` feature when built without `std`");

#[cfg(all(not(feature = "std"), feature = "alloc"))]
extern crate alloc;

pub mod errors;
/// The copy-on-write filter.
pub mod filter;
/// Session counters and capacity snapshots.
pub mod stats;

pub mod prelude {
    pub use super::errors::*;
    pub use super::filter::ShadowFilter;
    pub use super::stats::{FilterInfo, FilterStats};
}

/// Default block size in bytes, matching common disk sectors.
pub const DEFAULT_BLOCK_SIZE: u32 = 512;
