use std::sync::Arc;

use crate::metadata::Owner;
use crate::{EventFd, OpenFlags, Result, WaiterQueue, WaiterRegistry};

/// Creates instances of [`EventFd`].
///
/// All parameters are optional. By default the counter starts at zero, reads drain it, the
/// file is opened in blocking mode and it gets a fresh [`WaiterQueue`] of its own.
///
/// Use `EventFd::builder()` to create a new instance of this builder.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use eventfd::{EventFd, OpenFlags, WaiterQueue, WaiterRegistry};
///
/// let waiters: Arc<dyn WaiterRegistry> = Arc::new(WaiterQueue::new());
///
/// let eventfd = EventFd::builder()
///     .initial_value(10)
///     .semaphore(true)
///     .open_flags(OpenFlags::RDWR | OpenFlags::NONBLOCK)
///     .waiter_registry(waiters)
///     .build()
///     .unwrap();
///
/// assert!(eventfd.is_semaphore());
/// ```
#[derive(Debug)]
#[must_use]
pub struct EventFdBuilder {
    initial_value: u64,
    semaphore: bool,
    open_flags: OpenFlags,

    // If not set, the file gets a queue of its own.
    waiters: Option<Arc<dyn WaiterRegistry>>,

    owner: Owner,
}

impl EventFdBuilder {
    pub(crate) fn new() -> Self {
        Self {
            initial_value: 0,
            semaphore: false,
            open_flags: OpenFlags::RDWR,
            waiters: None,
            owner: Owner::default(),
        }
    }

    /// Sets the initial value of the counter. Must not exceed
    /// [`MAX_COUNTER`][crate::MAX_COUNTER].
    pub fn initial_value(self, initial_value: u64) -> Self {
        Self {
            initial_value,
            ..self
        }
    }

    /// Enables semaphore mode, in which every read returns `1` and decrements the counter by
    /// one instead of draining it. This cannot be changed later.
    pub fn semaphore(self, semaphore: bool) -> Self {
        Self { semaphore, ..self }
    }

    /// Sets the file status flags. [`OpenFlags::NONBLOCK`] makes reads and writes fail instead
    /// of blocking.
    pub fn open_flags(self, open_flags: OpenFlags) -> Self {
        Self { open_flags, ..self }
    }

    /// Sets the waiter registry that is told about readiness changes of the file and that
    /// blocked callers register with.
    pub fn waiter_registry(self, waiters: Arc<dyn WaiterRegistry>) -> Self {
        Self {
            waiters: Some(waiters),
            ..self
        }
    }

    /// Sets the owner reported by [`EventFd::stat()`], normally the effective user and group
    /// of the creating guest thread.
    pub fn owner(self, uid: u32, gid: u32) -> Self {
        Self {
            owner: Owner { uid, gid },
            ..self
        }
    }

    /// Creates the event counter file, holding one reference.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`][crate::Error::InvalidArgument] if the initial value
    /// exceeds [`MAX_COUNTER`][crate::MAX_COUNTER].
    pub fn build(self) -> Result<Arc<EventFd>> {
        let waiters: Arc<dyn WaiterRegistry> = self
            .waiters
            .unwrap_or_else(|| Arc::new(WaiterQueue::new()));

        EventFd::new(
            self.initial_value,
            self.semaphore,
            self.open_flags,
            waiters,
            self.owner,
        )
    }
}
