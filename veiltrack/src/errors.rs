// SPDX-License-Identifier: MIT

use core::fmt;

#[cfg(all(not(feature = "std"), feature = "alloc"))]
use alloc::collections::TryReserveError;
#[cfg(feature = "std")]
use std::collections::TryReserveError;

/// Result type for tracker operations.
pub type TrackResult<T = ()> = core::result::Result<T, TrackError>;

/// Unified error type for the remap engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackError {
    /// Malformed input: empty extent, empty pool, empty table dump.
    Invalid(&'static str),
    /// All spare capacity reachable from the allocation cursor is consumed.
    NoStorage,
    /// A transient buffer or result allocation failed.
    NoMemory,
}

impl TrackError {
    pub fn msg(&self) -> &'static str {
        match self {
            TrackError::Invalid(msg) => msg,
            TrackError::NoStorage => "No spare storage left",
            TrackError::NoMemory => "Out of memory",
        }
    }
}

impl From<&'static str> for TrackError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        TrackError::Invalid(msg)
    }
}

impl From<TryReserveError> for TrackError {
    #[inline]
    fn from(_: TryReserveError) -> Self {
        TrackError::NoMemory
    }
}

impl fmt::Display for TrackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}
