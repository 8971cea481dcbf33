use thiserror::Error;

use crate::abi;

/// Errors that can occur when operating on an event counter file.
///
/// Every variant corresponds to a guest-visible errno, available via [`Error::errno()`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The caller provided an argument the event counter file cannot accept,
    /// such as a buffer that is not 8 bytes long or an out-of-range counter value.
    #[error("invalid argument: {problem}")]
    InvalidArgument {
        /// A human-readable description of the problem.
        problem: &'static str,
    },

    /// The operation could not complete immediately and the caller asked not to block.
    #[error("operation would block")]
    WouldBlock,

    /// The caller was interrupted while blocked.
    #[error("blocking operation was interrupted")]
    Interrupted,

    /// The caller's deadline elapsed while blocked.
    #[error("blocking operation timed out")]
    TimedOut,

    /// Data could not be moved between the guest and the event counter file.
    #[error("bad address")]
    Fault,

    /// The last reference to the event counter file has already been released.
    #[error("event counter file has been released")]
    Released,
}

impl Error {
    /// Returns the errno the guest observes for this error.
    #[must_use]
    pub fn errno(&self) -> i32 {
        match self {
            Self::InvalidArgument { .. } => abi::EINVAL,
            Self::WouldBlock => abi::EAGAIN,
            Self::Interrupted => abi::EINTR,
            Self::TimedOut => abi::ETIMEDOUT,
            Self::Fault => abi::EFAULT,
            Self::Released => abi::EBADF,
        }
    }
}

/// A specialized `Result` type for event counter file operations, returning the crate's
/// [`Error`] type as the error value.
pub type Result<T> = std::result::Result<T, Error>;
