//! Bit sets exchanged with the guest and with the waiter subsystem.

use bitflags::bitflags;

use crate::abi;

bitflags! {
    /// Poll-style readiness conditions of an event counter file.
    ///
    /// The same type describes both the readiness broadcast after a state change and the
    /// interest an observer registers with the waiter subsystem.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct EventMask: u32 {
        /// The counter is non-zero, so a read can complete.
        const READABLE = abi::POLLIN;

        /// The counter can accept at least one more unit, so a write of `1` can complete.
        const WRITABLE = abi::POLLOUT;
    }
}

bitflags! {
    /// File status flags of an open event counter file.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct OpenFlags: u32 {
        /// Open for reading and writing. Event counter files are always opened this way.
        const RDWR = abi::O_RDWR;

        /// Reads and writes fail with [`Error::WouldBlock`][crate::Error::WouldBlock]
        /// instead of suspending the caller.
        const NONBLOCK = abi::O_NONBLOCK;

        /// Close the file on `execve()`. Carried for the file descriptor table; it does not
        /// affect the event counter file itself.
        const CLOEXEC = abi::O_CLOEXEC;
    }
}

impl OpenFlags {
    /// Flags that may be changed after the file has been opened.
    pub const MUTABLE: Self = Self::NONBLOCK;
}

bitflags! {
    /// Flags accepted by the `eventfd2()` system call.
    #[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
    pub struct EventFdFlags: u32 {
        /// Reads return `1` and decrement the counter by one.
        const SEMAPHORE = abi::EFD_SEMAPHORE;

        /// Equivalent to [`OpenFlags::NONBLOCK`].
        const NONBLOCK = abi::EFD_NONBLOCK;

        /// Equivalent to [`OpenFlags::CLOEXEC`].
        const CLOEXEC = abi::EFD_CLOEXEC;
    }
}

impl EventFdFlags {
    /// Translates the `eventfd2()` flags into the status flags of the new file.
    #[must_use]
    pub fn open_flags(self) -> OpenFlags {
        let mut flags = OpenFlags::RDWR;

        if self.contains(Self::NONBLOCK) {
            flags |= OpenFlags::NONBLOCK;
        }

        if self.contains(Self::CLOEXEC) {
            flags |= OpenFlags::CLOEXEC;
        }

        flags
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn eventfd2_flags_map_to_open_flags() {
        assert_eq!(EventFdFlags::empty().open_flags(), OpenFlags::RDWR);
        assert_eq!(
            EventFdFlags::NONBLOCK.open_flags(),
            OpenFlags::RDWR | OpenFlags::NONBLOCK
        );
        assert_eq!(
            (EventFdFlags::SEMAPHORE | EventFdFlags::CLOEXEC).open_flags(),
            OpenFlags::RDWR | OpenFlags::CLOEXEC
        );
    }

    #[test]
    fn unknown_eventfd2_flags_are_rejected() {
        assert!(EventFdFlags::from_bits(abi::EFD_SEMAPHORE | abi::EFD_NONBLOCK).is_some());
        assert!(EventFdFlags::from_bits(0x2).is_none());
    }

    #[test]
    fn readiness_bits_are_poll_bits() {
        assert_eq!(EventMask::READABLE.bits(), 0x1);
        assert_eq!(EventMask::WRITABLE.bits(), 0x4);
    }
}
