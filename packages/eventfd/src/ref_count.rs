use std::sync::atomic::{self, AtomicUsize};

/// Thread-safe count of the file descriptor table entries and other handles that refer to an
/// event counter file.
///
/// Memory is managed by `Arc`. This count tracks the guest-visible lifetime instead: once it
/// drops to zero the file is released and can never be referenced again.
#[derive(Debug)]
pub(crate) struct RefCount {
    count: AtomicUsize,
}

impl RefCount {
    /// Creates a reference count that starts with the creator's reference.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            count: AtomicUsize::new(1),
        }
    }

    /// Increments the reference count.
    ///
    /// # Panics
    ///
    /// Panics if the reference count was zero (indicating resurrection).
    pub(crate) fn inc_ref(&self) {
        assert_ne!(
            0,
            self.count.fetch_add(1, atomic::Ordering::Acquire),
            "reference acquired on an event counter file that was already released"
        );
    }

    /// Decrements the reference count and returns true if this was the last reference.
    ///
    /// # Panics
    ///
    /// Panics if the reference count would underflow (go below zero).
    pub(crate) fn dec_ref(&self) -> bool {
        match self.count.fetch_sub(1, atomic::Ordering::Release) {
            1 => {
                // Pairs with the Release above so the finalizer sees every write made while
                // other references were still alive.
                atomic::fence(atomic::Ordering::Acquire);

                true
            }
            0 => panic!(
                "reference count underflow - indicates a serious bug in reference counting logic"
            ),
            _ => false,
        }
    }

    #[must_use]
    pub(crate) fn get(&self) -> usize {
        self.count.load(atomic::Ordering::Acquire)
    }

    #[must_use]
    pub(crate) fn is_released(&self) -> bool {
        self.get() == 0
    }
}
