//! Counter state machine of an event counter file.
//!
//! The counter moves within `0..=MAX_COUNTER`. Writes add to it, reads either drain it
//! (normal mode) or take one unit from it (semaphore mode). `u64::MAX` is a sentinel that the
//! counter never reaches: a write that would take it there is refused and the caller blocks
//! or receives `WouldBlock` instead.
//!
//! This type is not synchronized. The owning event counter file keeps it behind its state lock.

use std::mem;

use crate::{EventMask, MAX_COUNTER};

#[derive(Debug)]
pub(crate) struct Counter {
    value: u64,

    // Fixed at creation.
    semaphore: bool,
}

impl Counter {
    /// # Panics
    ///
    /// Panics if `value` exceeds [`MAX_COUNTER`]. Callers validate guest input beforehand.
    #[must_use]
    pub(crate) fn new(value: u64, semaphore: bool) -> Self {
        assert!(
            value <= MAX_COUNTER,
            "counter value {value} is above the maximum of {MAX_COUNTER}"
        );

        Self { value, semaphore }
    }

    #[must_use]
    pub(crate) fn value(&self) -> u64 {
        self.value
    }

    #[must_use]
    pub(crate) fn is_semaphore(&self) -> bool {
        self.semaphore
    }

    /// Whether `value` can be added without the counter exceeding [`MAX_COUNTER`].
    #[must_use]
    pub(crate) fn can_write(&self, value: u64) -> bool {
        // Never compute `self.value + value` here, it may wrap.
        value <= MAX_COUNTER.wrapping_sub(self.value)
    }

    /// # Panics
    ///
    /// Panics if `can_write(value)` does not hold.
    pub(crate) fn apply_write(&mut self, value: u64) {
        assert!(self.can_write(value), "write of {value} would overflow the counter");

        self.value = self
            .value
            .checked_add(value)
            .expect("guarded by can_write() so addition cannot overflow");
    }

    #[must_use]
    pub(crate) fn can_read(&self) -> bool {
        self.value > 0
    }

    /// Consumes from the counter and returns the value the reader receives.
    ///
    /// # Panics
    ///
    /// Panics if the counter is zero.
    pub(crate) fn apply_read(&mut self) -> u64 {
        assert!(self.can_read(), "read from a zero counter");

        if self.semaphore {
            self.value = self
                .value
                .checked_sub(1)
                .expect("guarded by can_read() so subtraction cannot underflow");
            1
        } else {
            mem::take(&mut self.value)
        }
    }

    /// Applies the write if it fits, returning whether it did.
    pub(crate) fn try_write(&mut self, value: u64) -> bool {
        if !self.can_write(value) {
            return false;
        }

        self.apply_write(value);
        true
    }

    /// Applies a read if the counter is non-zero, returning the value the reader receives.
    pub(crate) fn try_read(&mut self) -> Option<u64> {
        self.can_read().then(|| self.apply_read())
    }

    /// The readiness conditions that currently hold.
    #[must_use]
    pub(crate) fn readiness(&self) -> EventMask {
        let mut mask = EventMask::empty();

        if self.value > 0 {
            mask |= EventMask::READABLE;
        }

        if self.value < MAX_COUNTER {
            mask |= EventMask::WRITABLE;
        }

        mask
    }
}
