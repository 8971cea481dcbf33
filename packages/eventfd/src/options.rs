//! Per-call options of event counter file operations.

use crate::abi;

/// Options for [`EventFd::read()`][crate::EventFd::read].
#[derive(Clone, Copy, Debug, Default)]
pub struct ReadOptions {
    no_wait: bool,
}

impl ReadOptions {
    /// Default options: the call blocks unless the file is non-blocking.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`Error::WouldBlock`][crate::Error::WouldBlock] instead of blocking, even if
    /// the file is in blocking mode (`RWF_NOWAIT`).
    #[must_use]
    pub fn no_wait(self, no_wait: bool) -> Self {
        Self { no_wait }
    }

    #[must_use]
    pub(crate) fn is_no_wait(&self) -> bool {
        self.no_wait
    }
}

/// Options for [`EventFd::write()`][crate::EventFd::write].
#[derive(Clone, Copy, Debug, Default)]
pub struct WriteOptions {
    no_wait: bool,
}

impl WriteOptions {
    /// Default options: the call blocks unless the file is non-blocking.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail with [`Error::WouldBlock`][crate::Error::WouldBlock] instead of blocking, even if
    /// the file is in blocking mode (`RWF_NOWAIT`).
    #[must_use]
    pub fn no_wait(self, no_wait: bool) -> Self {
        Self { no_wait }
    }

    #[must_use]
    pub(crate) fn is_no_wait(&self) -> bool {
        self.no_wait
    }
}

/// Options for [`EventFd::stat()`][crate::EventFd::stat].
#[derive(Clone, Copy, Debug)]
pub struct StatOptions {
    mask: u32,
}

impl StatOptions {
    /// Requests the fields selected by `mask`, a combination of the `STATX_*` bits in
    /// [`abi`][crate::abi].
    #[must_use]
    pub fn new(mask: u32) -> Self {
        Self { mask }
    }

    /// The requested `STATX_*` fields.
    #[must_use]
    pub fn mask(&self) -> u32 {
        self.mask
    }
}

impl Default for StatOptions {
    fn default() -> Self {
        Self::new(abi::STATX_BASIC_STATS)
    }
}
