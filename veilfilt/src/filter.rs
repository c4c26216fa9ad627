// SPDX-License-Identifier: MIT

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::vec;

use log::{debug, trace};

use veilio::VeilIO;
use veiltrack::extent::Extent;
use veiltrack::tracker::Tracker;

use crate::errors::*;
use crate::stats::{FilterInfo, FilterStats};

/// Copy-on-write filter over a single block device.
///
/// Spare storage lives on the same device as the protected range (typically a
/// pre-allocated region or file), so redirection is purely a matter of
/// resolving each request into runs and transferring every run at its
/// resolved offset.
///
/// Requests must be aligned to the block size. Outside a tracking session the
/// filter is a transparent pass-through.
pub struct ShadowFilter<'d, IO: VeilIO + ?Sized> {
    dev: &'d mut IO,
    tracker: Tracker,
    block_size: u32,
    tracking: bool,
    simulate: bool,
    low_space_pct: u8,
    stats: FilterStats,
}

impl<'d, IO: VeilIO + ?Sized> ShadowFilter<'d, IO> {
    /// Wraps `dev`, redirecting tracked writes through `tracker`.
    pub fn new(dev: &'d mut IO, tracker: Tracker, block_size: u32) -> FiltResult<Self> {
        if block_size == 0 {
            return Err(FiltError::Invalid("block size must be non-zero"));
        }
        Ok(Self {
            dev,
            tracker,
            block_size,
            tracking: false,
            simulate: false,
            low_space_pct: 0,
            stats: FilterStats::default(),
        })
    }

    /// Arms [`Self::low_space`] to trip once free capacity falls below
    /// `percent` of the total.
    pub fn with_low_space_watermark(mut self, percent: u8) -> Self {
        self.low_space_pct = percent.min(100);
        self
    }

    /// Starts a tracking session. With `simulate`, remaps are computed and
    /// capacity is consumed but all IO still goes to the original location.
    pub fn start_tracking(&mut self, simulate: bool) {
        debug!("tracking started (simulate: {simulate})");
        self.tracking = true;
        self.simulate = simulate;
    }

    #[inline]
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    /// Ends the session and throws the redirected data away.
    pub fn stop_discard(&mut self) -> FiltResult {
        if !self.tracking {
            return Err(FiltError::NotTracking);
        }
        debug!(
            "tracking stopped, discarding {} redirected blocks",
            self.tracker.remapped_blocks()
        );
        self.tracking = false;
        self.tracker.reset();
        Ok(())
    }

    /// Ends the session and folds every redirected block back over its
    /// source location. Returns the number of blocks copied back.
    pub fn stop_merge(&mut self) -> FiltResult<u64> {
        if !self.tracking {
            return Err(FiltError::NotTracking);
        }

        let mut merged = 0u64;
        // In simulation nothing real ever reached the spare blocks
        if !self.simulate && self.tracker.remapped_blocks() > 0 {
            let bs = self.block_size as usize;
            for remap in self.tracker.all_remaps()? {
                let mut source_block = remap.source().start_block;
                for run in remap.extents() {
                    let len = run.length_in_blocks as usize * bs;
                    let mut data = vec![0u8; len];
                    self.dev
                        .read_at(run.start_block * self.block_size as u64, &mut data)?;
                    self.dev
                        .write_at(source_block * self.block_size as u64, &data)?;
                    source_block += run.length_in_blocks as u64;
                    merged += run.length_in_blocks as u64;
                }
            }
            self.dev.flush()?;
        }

        debug!("tracking stopped, merged {merged} blocks back");
        self.tracking = false;
        self.tracker.reset();
        Ok(merged)
    }

    /// Reads `buf.len()` bytes at `offset`, transparently gathering
    /// redirected blocks from spare storage.
    pub fn read(&mut self, offset: u64, buf: &mut [u8]) -> FiltResult {
        // Zero-length and untracked requests pass straight through
        if buf.is_empty() || !self.tracking {
            return Ok(self.dev.read_at(offset, buf)?);
        }

        let source = self.to_blocks(offset, buf.len())?;
        let remap = self.tracker.find_remap(source)?;
        trace!("read {remap}");

        self.stats.reads += 1;
        self.stats.read_hits += remap.num_remapped() as u64;

        if self.simulate {
            return Ok(self.dev.read_at(offset, buf)?);
        }

        let bs = self.block_size as usize;
        let mut pos = 0usize;
        for run in remap.extents() {
            let len = run.length_in_blocks as usize * bs;
            self.dev
                .read_at(run.start_block * self.block_size as u64, &mut buf[pos..pos + len])?;
            pos += len;
        }
        Ok(())
    }

    /// Writes `data` at `offset`, redirecting every block of a tracked
    /// request to spare storage.
    pub fn write(&mut self, offset: u64, data: &[u8]) -> FiltResult {
        if data.is_empty() || !self.tracking {
            return Ok(self.dev.write_at(offset, data)?);
        }

        let source = self.to_blocks(offset, data.len())?;
        let remap = self.tracker.remap(source)?;
        trace!("write {remap}");

        self.stats.writes += 1;
        self.stats.write_hits += remap.num_remapped() as u64;

        if self.simulate {
            return Ok(self.dev.write_at(offset, data)?);
        }

        let bs = self.block_size as usize;
        let mut pos = 0usize;
        for run in remap.extents() {
            let len = run.length_in_blocks as usize * bs;
            self.dev
                .write_at(run.start_block * self.block_size as u64, &data[pos..pos + len])?;
            pos += len;
        }
        Ok(())
    }

    pub fn flush(&mut self) -> FiltResult {
        Ok(self.dev.flush()?)
    }

    /// Tracking state and capacity snapshot.
    pub fn info(&self) -> FilterInfo {
        let (total_blocks, free_blocks) = self.tracker.storage_info();
        FilterInfo {
            tracking: self.tracking,
            remapped_blocks: self.tracker.remapped_blocks() as u64,
            total_blocks,
            free_blocks,
        }
    }

    #[inline]
    pub fn stats(&self) -> &FilterStats {
        &self.stats
    }

    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Whether free capacity has fallen below the configured watermark.
    /// Callers react by growing the tracker with more spare storage.
    pub fn low_space(&self) -> bool {
        if self.low_space_pct == 0 {
            return false;
        }
        let (total, free) = self.tracker.storage_info();
        free * 100 < total * self.low_space_pct as u64
    }

    #[inline]
    pub fn tracker(&self) -> &Tracker {
        &self.tracker
    }

    #[inline]
    pub fn tracker_mut(&mut self) -> &mut Tracker {
        &mut self.tracker
    }

    fn to_blocks(&self, offset: u64, len: usize) -> FiltResult<Extent> {
        let bs = self.block_size as u64;
        if !offset.is_multiple_of(bs) || !(len as u64).is_multiple_of(bs) {
            return Err(FiltError::Invalid("request not block aligned"));
        }
        let blocks = len as u64 / bs;
        if blocks > u32::MAX as u64 {
            return Err(FiltError::Invalid("request spans too many blocks"));
        }
        Ok(Extent::new(offset / bs, blocks as u32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use veilio::prelude::*;
    use veiltrack::prelude::*;

    const BS: u32 = 16;

    /// 128-block device; blocks [64, 96) serve as spare storage.
    fn spare_tracker() -> Tracker {
        Tracker::new(StoragePool::new(vec![Extent::new(64, 32)]).unwrap())
    }

    fn block_of(buf: &[u8], block: u64) -> &[u8] {
        let bs = BS as usize;
        &buf[block as usize * bs..(block as usize + 1) * bs]
    }

    #[test]
    fn passthrough_when_not_tracking() {
        let mut buf = vec![0u8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();

        filter.write(4 * BS as u64, &[0xBB; 2 * BS as usize]).unwrap();

        drop(filter);
        assert_eq!(block_of(&buf, 4), &[0xBB; BS as usize]);
        assert_eq!(block_of(&buf, 64), &[0u8; BS as usize]);
    }

    #[test]
    fn tracked_write_lands_in_spare_storage() {
        let mut buf = vec![0xAAu8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        filter.write(4 * BS as u64, &[0xBB; 2 * BS as usize]).unwrap();

        // Reads through the filter see the new data
        let mut out = vec![0u8; 2 * BS as usize];
        filter.read(4 * BS as u64, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0xBB));

        drop(filter);
        // The original blocks still carry the old data; the spare ones carry
        // the redirected payload
        assert_eq!(block_of(&buf, 4), &[0xAA; BS as usize]);
        assert_eq!(block_of(&buf, 64), &[0xBB; BS as usize]);
        assert_eq!(block_of(&buf, 65), &[0xBB; BS as usize]);
    }

    #[test]
    fn read_merges_shadow_and_original() {
        let mut buf = vec![0xAAu8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        // Redirect blocks 4 and 5, then read 2..8
        filter.write(4 * BS as u64, &[0xBB; 2 * BS as usize]).unwrap();
        let mut out = vec![0u8; 6 * BS as usize];
        filter.read(2 * BS as u64, &mut out).unwrap();

        assert!(out[..2 * BS as usize].iter().all(|&b| b == 0xAA));
        assert!(out[2 * BS as usize..4 * BS as usize].iter().all(|&b| b == 0xBB));
        assert!(out[4 * BS as usize..].iter().all(|&b| b == 0xAA));
    }

    #[test]
    fn one_device_transfer_per_run() {
        let mut buf = vec![0xAAu8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut counted = IoCounter::new(&mut io);
        let mut filter = ShadowFilter::new(&mut counted, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        filter.write(4 * BS as u64, &[0xBB; 2 * BS as usize]).unwrap();

        // Pass-through prefix, redirected middle, pass-through suffix
        let mut out = vec![0u8; 6 * BS as usize];
        filter.read(2 * BS as u64, &mut out).unwrap();

        drop(filter);
        let stats = counted.snapshot();
        assert_eq!(stats.reads, 3);
        assert_eq!(stats.writes, 1);
    }

    #[test]
    fn stop_merge_folds_shadow_data_back() {
        let mut buf = vec![0xAAu8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        filter.write(4 * BS as u64, &[0xBB; 2 * BS as usize]).unwrap();
        filter.write(9 * BS as u64, &[0xCC; BS as usize]).unwrap();

        let merged = filter.stop_merge().unwrap();
        assert_eq!(merged, 3);

        let info = filter.info();
        assert!(!info.tracking);
        assert_eq!(info.remapped_blocks, 0);
        assert_eq!(info.free_blocks, info.total_blocks);

        drop(filter);
        // The source locations now hold the redirected payloads
        assert_eq!(block_of(&buf, 4), &[0xBB; BS as usize]);
        assert_eq!(block_of(&buf, 5), &[0xBB; BS as usize]);
        assert_eq!(block_of(&buf, 9), &[0xCC; BS as usize]);
    }

    #[test]
    fn stop_discard_resets_everything() {
        let mut buf = vec![0xAAu8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        filter.write(4 * BS as u64, &[0xBB; BS as usize]).unwrap();
        filter.stop_discard().unwrap();

        // Untracked reads see the untouched original data again
        let mut out = vec![0u8; BS as usize];
        filter.read(4 * BS as u64, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0xAA));

        assert_eq!(filter.stop_discard().unwrap_err(), FiltError::NotTracking);
    }

    #[test]
    fn simulation_consumes_capacity_but_not_io() {
        let mut buf = vec![0xAAu8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(true);

        filter.write(4 * BS as u64, &[0xBB; BS as usize]).unwrap();

        let info = filter.info();
        assert_eq!(info.remapped_blocks, 1);
        assert_eq!(info.free_blocks, info.total_blocks - 1);
        assert_eq!(filter.stop_merge().unwrap(), 0);

        drop(filter);
        // The write went to the original location; spare blocks stay clean
        assert_eq!(block_of(&buf, 4), &[0xBB; BS as usize]);
        assert_eq!(block_of(&buf, 64), &[0xAA; BS as usize]);
    }

    #[test]
    fn hit_counters() {
        let mut buf = vec![0u8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        filter.write(4 * BS as u64, &[1; 2 * BS as usize]).unwrap();
        let mut out = vec![0u8; 2 * BS as usize];
        filter.read(4 * BS as u64, &mut out).unwrap();
        filter.read(20 * BS as u64, &mut out).unwrap();

        let stats = filter.stats();
        assert_eq!(stats.writes, 1);
        assert_eq!(stats.write_hits, 2);
        assert_eq!(stats.reads, 2);
        assert_eq!(stats.read_hits, 2);
    }

    #[test]
    fn unaligned_requests_are_rejected() {
        let mut buf = vec![0u8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        let mut out = vec![0u8; BS as usize];
        assert!(matches!(
            filter.read(3, &mut out),
            Err(FiltError::Invalid(_))
        ));
        assert!(matches!(
            filter.write(0, &[0; 5]),
            Err(FiltError::Invalid(_))
        ));
    }

    #[test]
    fn zero_length_requests_pass_through() {
        let mut buf = vec![0u8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        filter.write(3, &[]).unwrap();
        filter.read(3, &mut []).unwrap();
        assert_eq!(filter.stats().writes, 0);
    }

    #[test]
    fn low_space_watermark_trips() {
        let mut buf = vec![0u8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let tracker = Tracker::new(StoragePool::new(vec![Extent::new(64, 10)]).unwrap());
        let mut filter = ShadowFilter::new(&mut io, tracker, BS)
            .unwrap()
            .with_low_space_watermark(50);
        filter.start_tracking(false);

        filter.write(0, &[7; 4 * BS as usize]).unwrap();
        assert!(!filter.low_space());

        filter.write(30 * BS as u64, &[7; 2 * BS as usize]).unwrap();
        assert!(filter.low_space());
    }

    #[test]
    fn exhaustion_surfaces_as_track_error() {
        let mut buf = vec![0u8; 128 * BS as usize];
        let mut io = MemVeilIO::new(&mut buf);
        let tracker = Tracker::new(StoragePool::new(vec![Extent::new(64, 4)]).unwrap());
        let mut filter = ShadowFilter::new(&mut io, tracker, BS).unwrap();
        filter.start_tracking(false);

        assert_eq!(
            filter.write(0, &[7; 8 * BS as usize]).unwrap_err(),
            FiltError::Track(TrackError::NoStorage)
        );
    }

    #[test]
    fn file_backed_device() {
        use tempfile::tempfile;

        let mut file = tempfile().unwrap();
        let mut io = StdVeilIO::new(&mut file);
        io.set_len(128 * BS as u64).unwrap();

        let mut filter = ShadowFilter::new(&mut io, spare_tracker(), BS).unwrap();
        filter.start_tracking(false);

        filter.write(4 * BS as u64, &[0xBB; BS as usize]).unwrap();
        let mut out = vec![0u8; BS as usize];
        filter.read(4 * BS as u64, &mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0xBB));

        drop(filter);
        // The original block on disk is still zero
        let mut original = vec![0u8; BS as usize];
        io.read_at(4 * BS as u64, &mut original).unwrap();
        assert!(original.iter().all(|&b| b == 0));
    }
}
