// SPDX-License-Identifier: MIT

use std::io::{Error, Read, Seek, SeekFrom, Write};

use crate::errors::{VeilIOError, VeilIOResult};
use crate::{VeilIO, VeilIOSetLen};

/// `VeilIO` backend over any `Read + Write + Seek` stream (typically a file).
#[derive(Debug)]
pub struct StdVeilIO<'a, T: Read + Write + Seek> {
    io: &'a mut T,
}

impl<'a, T: Read + Write + Seek> StdVeilIO<'a, T> {
    #[inline]
    pub fn new(io: &'a mut T) -> Self {
        Self { io }
    }
}

impl<'a, T: Read + Write + Seek> VeilIO for StdVeilIO<'a, T> {
    fn write_at(&mut self, offset: u64, data: &[u8]) -> VeilIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.write_all(data)?;
        Ok(())
    }

    fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> VeilIOResult {
        self.io.seek(SeekFrom::Start(offset))?;
        self.io.read_exact(buf)?;
        Ok(())
    }

    fn flush(&mut self) -> VeilIOResult {
        self.io.flush()?;
        Ok(())
    }
}

impl<'a> VeilIOSetLen for StdVeilIO<'a, std::fs::File> {
    fn set_len(&mut self, len: u64) -> VeilIOResult {
        self.io.set_len(len)?;
        self.flush()?;
        self.io.seek(SeekFrom::Start(0))?;
        Ok(())
    }
}

impl From<Error> for VeilIOError {
    #[cold]
    #[inline(never)]
    fn from(e: Error) -> Self {
        // Leak the string to produce a 'static str. Acceptable for error mapping.
        let leaked_str: &'static str = Box::leak(e.to_string().into_boxed_str());
        VeilIOError::Other(leaked_str)
    }
}
