// SPDX-License-Identifier: MIT

//! Fixed-layout records for shipping remap results and capacity reports
//! across a control channel.
//!
//! Layouts are packed little-endian structs; an encoded remap result is a
//! [`RawRemapHeader`] followed by `number_of_extents` [`RawExtent`]s.

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec::Vec;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

use crate::errors::*;
use crate::extent::Extent;
use crate::remap::ExtentRemap;

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct RawExtent {
    pub start_block: u64,
    pub length_in_blocks: u32,
}

impl From<Extent> for RawExtent {
    #[inline]
    fn from(e: Extent) -> Self {
        Self {
            start_block: e.start_block,
            length_in_blocks: e.length_in_blocks,
        }
    }
}

impl From<RawExtent> for Extent {
    #[inline]
    fn from(e: RawExtent) -> Self {
        Self {
            start_block: e.start_block,
            length_in_blocks: e.length_in_blocks,
        }
    }
}

#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct RawRemapHeader {
    pub source: RawExtent,
    pub number_of_extents: u32,
    pub num_remapped: u32,
}

/// Capacity report record.
#[derive(IntoBytes, FromBytes, KnownLayout, Immutable, Copy, Clone, Debug)]
#[repr(C, packed)]
pub struct RawStorageInfo {
    pub total_blocks: u64,
    pub free_blocks: u64,
    pub remapped_blocks: u64,
}

/// Serializes a remap result as header + extent array.
pub fn encode_remap(remap: &ExtentRemap) -> TrackResult<Vec<u8>> {
    let header = RawRemapHeader {
        source: remap.source().into(),
        number_of_extents: remap.number_of_extents(),
        num_remapped: remap.num_remapped(),
    };

    let len = size_of::<RawRemapHeader>() + size_of::<RawExtent>() * remap.extents().len();
    let mut out = Vec::new();
    out.try_reserve_exact(len)?;

    out.extend_from_slice(header.as_bytes());
    for e in remap.extents() {
        out.extend_from_slice(RawExtent::from(*e).as_bytes());
    }
    Ok(out)
}

/// Deserializes a record produced by [`encode_remap`].
pub fn decode_remap(bytes: &[u8]) -> TrackResult<ExtentRemap> {
    let (header, mut rest) = RawRemapHeader::read_from_prefix(bytes)
        .map_err(|_| TrackError::Invalid("truncated remap record"))?;

    let count = header.number_of_extents as usize;
    let mut extents = Vec::new();
    extents.try_reserve_exact(count)?;

    for _ in 0..count {
        let (raw, tail) = RawExtent::read_from_prefix(rest)
            .map_err(|_| TrackError::Invalid("truncated remap record"))?;
        extents.push(Extent::from(raw));
        rest = tail;
    }

    Ok(ExtentRemap::new(
        header.source.into(),
        header.num_remapped,
        extents.into_boxed_slice(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::StoragePool;
    use crate::tracker::Tracker;

    use veilio::prelude::*;

    #[test]
    fn layouts_are_packed() {
        assert_eq!(size_of::<RawExtent>(), 12);
        assert_eq!(size_of::<RawRemapHeader>(), 20);
        assert_eq!(size_of::<RawStorageInfo>(), 24);
    }

    #[test]
    fn remap_record_roundtrip() {
        let mut tracker = Tracker::new(
            StoragePool::new(vec![Extent::new(10, 10), Extent::new(100, 10)]).unwrap(),
        );
        tracker.remap(Extent::new(50, 5)).unwrap();
        let resolved = tracker.find_remap(Extent::new(47, 10)).unwrap();

        let bytes = encode_remap(&resolved).unwrap();
        let decoded = decode_remap(&bytes).unwrap();
        assert_eq!(decoded, resolved);
    }

    #[test]
    fn decode_rejects_truncation() {
        let mut tracker =
            Tracker::new(StoragePool::new(vec![Extent::new(10, 10)]).unwrap());
        tracker.remap(Extent::new(50, 5)).unwrap();
        let bytes = encode_remap(&tracker.find_remap(Extent::new(50, 5)).unwrap()).unwrap();

        assert!(decode_remap(&bytes[..bytes.len() - 1]).is_err());
        assert!(decode_remap(&bytes[..4]).is_err());
    }

    #[test]
    fn storage_info_through_device() {
        // Capacity record written to and read back from a raw device region
        let mut buf = [0u8; 64];
        let mut io = MemVeilIO::new(&mut buf);

        let info = RawStorageInfo {
            total_blocks: 20,
            free_blocks: 15,
            remapped_blocks: 5,
        };
        io.write_struct(8, &info).unwrap();

        let back: RawStorageInfo = io.read_struct(8).unwrap();
        assert_eq!(back.as_bytes(), info.as_bytes());
    }
}
