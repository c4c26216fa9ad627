// SPDX-License-Identifier: MIT

use core::fmt;

use veilio::errors::VeilIOError;
use veiltrack::errors::TrackError;

/// Result type for filter operations.
pub type FiltResult<T = ()> = core::result::Result<T, FiltError>;

/// Unified error type for the write-redirection filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FiltError {
    Io(VeilIOError),
    Track(TrackError),
    Invalid(&'static str),
    NotTracking,
}

impl FiltError {
    pub fn msg(&self) -> &'static str {
        match self {
            FiltError::Io(e) => e.msg(),
            FiltError::Track(e) => e.msg(),
            FiltError::Invalid(msg) => msg,
            FiltError::NotTracking => "No tracking session is active",
        }
    }
}

impl From<VeilIOError> for FiltError {
    #[inline]
    fn from(e: VeilIOError) -> Self {
        FiltError::Io(e)
    }
}

impl From<TrackError> for FiltError {
    #[inline]
    fn from(e: TrackError) -> Self {
        FiltError::Track(e)
    }
}

impl fmt::Display for FiltError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}
