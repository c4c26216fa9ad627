// SPDX-License-Identifier: MIT

use core::fmt;

/// Result type for VeilIO operations.
pub type VeilIOResult<T = ()> = core::result::Result<T, VeilIOError>;

/// Error type for VeilIO operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VeilIOError {
    Other(&'static str),
    OutOfBounds,
    Unsupported,
}

impl VeilIOError {
    pub fn msg(&self) -> &'static str {
        match self {
            VeilIOError::Other(msg) => msg,
            VeilIOError::OutOfBounds => "Out of bounds",
            VeilIOError::Unsupported => "Unsupported operation",
        }
    }
}

impl From<&'static str> for VeilIOError {
    #[inline]
    fn from(msg: &'static str) -> Self {
        VeilIOError::Other(msg)
    }
}

impl fmt::Display for VeilIOError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.msg())?;
        Ok(())
    }
}
