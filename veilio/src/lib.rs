// SPDX-License-Identifier: MIT
#![cfg_attr(not(feature = "std"), no_std)]

// Core modules
pub mod errors;
mod macros;
pub mod stats;

// Backend modules
#[cfg(feature = "mem")]
mod mem;

#[cfg(feature = "std")]
mod std_io;

// Prelude re-exports (central entrypoint)
pub mod prelude {
    pub use super::VeilIO;
    pub use super::VeilIOExt;
    pub use super::VeilIOSetLen;
    pub use super::VeilIOStructExt;
    pub use super::errors::*;
    pub use super::stats::*;

    #[cfg(feature = "mem")]
    pub use super::mem::MemVeilIO;

    #[cfg(feature = "std")]
    pub use super::std_io::StdVeilIO;
}

// Internal use
use errors::*;

// Constants

/// Maximum size of internal scratch buffer (used for zero-fill and struct IO).
/// 4 KiB = typical page size and common disk sector/cluster size.
/// Safe for no_std stack usage, overridable in high-level code.
pub const BLOCK_BUF_SIZE: usize = 4096;

// Traits

/// Block IO abstraction trait.
///
/// Allows read/write/flush at arbitrary byte offsets.
/// Implementations may target RAM, files, block devices, etc.
pub trait VeilIO {
    /// Writes `data` at `offset` (absolute).
    fn write_at(&mut self, offset: u64, data: &[u8]) -> VeilIOResult;

    /// Reads `buf.len()` bytes into `buf` from `offset` (absolute).
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VeilIOResult;

    /// Flushes any buffered data (may be a no-op).
    fn flush(&mut self) -> VeilIOResult;
}

/// Extension helpers for VeilIO.
///
/// Provides convenient helpers:
/// - zero fill
/// - low-level primitive reads/writes (read_u32_at, write_u64_at, ...)
pub trait VeilIOExt: VeilIO {
    /// Fills a region with zeroes.
    ///
    /// Used for clearing spare regions before handing them to an allocator.
    #[inline(always)]
    fn zero_fill(&mut self, offset: u64, len: usize) -> VeilIOResult {
        const ZERO_BUF: [u8; BLOCK_BUF_SIZE] = [0u8; BLOCK_BUF_SIZE];
        let mut remaining = len;
        let mut off = offset;
        while remaining > 0 {
            let chunk = remaining.min(ZERO_BUF.len());
            self.write_at(off, &ZERO_BUF[..chunk])?;
            off += chunk as u64;
            remaining -= chunk;
        }
        Ok(())
    }

    // Implements read/write helpers for primitive types (u16, u32, u64, u128)
    veilio_impl_primitive_rw!(u16, u32, u64, u128);
}

impl<T: VeilIO + ?Sized> VeilIOExt for T {}

/// Trait for setting the length of a VeilIO object.
///
/// Allows resizing the underlying storage (if supported by the backend).
pub trait VeilIOSetLen: VeilIO {
    /// Sets the length of the storage.
    fn set_len(&mut self, len: u64) -> VeilIOResult;
}

/// Extension trait for reading and writing structs using zerocopy.
///
/// Provides helpers to read a struct from a given offset and write a struct at
/// a given offset. Requires the struct to implement zerocopy traits for safe
/// conversion.
pub trait VeilIOStructExt: VeilIO {
    /// Reads a struct of type `T` from the given offset.
    fn read_struct<T: zerocopy::FromBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
    ) -> VeilIOResult<T> {
        let size = core::mem::size_of::<T>();
        assert!(size <= BLOCK_BUF_SIZE, "read_struct: type too large");
        let mut buf = [0u8; BLOCK_BUF_SIZE];
        self.read_at(offset, &mut buf[..size])?;
        T::read_from_bytes(&buf[..size]).map_err(|_| VeilIOError::Other("read_struct failed"))
    }

    /// Writes a struct of type `T` at the given offset.
    fn write_struct<T: zerocopy::IntoBytes + zerocopy::KnownLayout + zerocopy::Immutable>(
        &mut self,
        offset: u64,
        val: &T,
    ) -> VeilIOResult {
        let bytes = val.as_bytes();
        self.write_at(offset, bytes)
    }
}

impl<T: VeilIO + ?Sized> VeilIOStructExt for T {}
