// SPDX-License-Identifier: MIT

use crate::VeilIO;
use crate::errors::VeilIOResult;

/// Simple IO counters, no_std friendly.
#[derive(Clone, Copy, Default, Debug)]
pub struct IoStats {
    pub reads: u64,
    pub read_bytes: u64,
    pub writes: u64,
    pub write_bytes: u64,
    pub flushes: u64,

    // Useful sizes to diagnose request granularity
    pub max_read: u64,
    pub max_write: u64,
}

impl IoStats {
    #[inline]
    pub fn reset(&mut self) {
        *self = IoStats::default();
    }
}

/// Transparent instrumentation wrapper.
///
/// Counts operations and byte volumes without altering behavior. Handy to
/// observe how a caller splits a request into per-run device transfers.
pub struct IoCounter<'a, IO: VeilIO + ?Sized> {
    inner: &'a mut IO,
    pub stats: IoStats,
}

impl<'a, IO: VeilIO + ?Sized> IoCounter<'a, IO> {
    #[inline]
    pub fn new(inner: &'a mut IO) -> Self {
        Self {
            inner,
            stats: IoStats::default(),
        }
    }

    #[inline]
    pub fn snapshot(&self) -> IoStats {
        self.stats
    }

    #[inline]
    pub fn into_inner(self) -> &'a mut IO {
        self.inner
    }
}

impl<'a, IO: VeilIO + ?Sized> VeilIO for IoCounter<'a, IO> {
    #[inline]
    fn write_at(&mut self, offset: u64, data: &[u8]) -> VeilIOResult {
        self.stats.writes += 1;
        self.stats.write_bytes += data.len() as u64;
        if self.stats.max_write < data.len() as u64 {
            self.stats.max_write = data.len() as u64;
        }
        self.inner.write_at(offset, data)
    }

    #[inline]
    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VeilIOResult {
        self.stats.reads += 1;
        self.stats.read_bytes += buf.len() as u64;
        if self.stats.max_read < buf.len() as u64 {
            self.stats.max_read = buf.len() as u64;
        }
        self.inner.read_at(offset, buf)
    }

    #[inline]
    fn flush(&mut self) -> VeilIOResult {
        self.stats.flushes += 1;
        self.inner.flush()
    }
}
