use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use scopeguard::guard;
use tracing::{debug, trace, warn};

use crate::constants::ERR_POISONED_LOCK;
use crate::counter::Counter;
use crate::metadata::Owner;
use crate::ref_count::RefCount;
use crate::{
    ByteSink, ByteSource, Context, Error, EventFdBuilder, EventFdFlags, EventMask, MAX_COUNTER,
    Metadata, Observer, OpenFlags, ReadOptions, Result, StatOptions, VALUE_SIZE, WaiterId,
    WaiterRegistry, WriteOptions,
};

// Identifies event counter files in fdinfo output.
static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// An event counter file: a 64-bit counter that guest threads write to and read from to signal
/// each other, and that the waiter subsystem can poll for readiness.
///
/// * A write adds an 8-byte value to the counter. If the sum would exceed [`MAX_COUNTER`],
///   the write blocks until a read makes room, or fails with [`Error::WouldBlock`] if the file
///   is non-blocking.
/// * A read returns the counter and resets it to zero or, in semaphore mode, returns `1` and
///   decrements it by one. A read of a zero counter blocks, or fails with
///   [`Error::WouldBlock`] if the file is non-blocking.
/// * After every change of the counter, the current [`EventMask`] is broadcast to the waiter
///   registry: readable if the counter is non-zero, writable if it is below [`MAX_COUNTER`].
///
/// Event counter files are reference counted on behalf of the guest. The creator holds the
/// first reference; once the last one is released via [`release_reference()`][1], every
/// further operation fails with [`Error::Released`].
///
/// # Example
///
/// ```rust
/// use eventfd::{Context, EventFd, ReadOptions, WriteOptions};
///
/// let eventfd = EventFd::builder().semaphore(true).build().unwrap();
/// let ctx = Context::new();
///
/// let written = eventfd
///     .write(&ctx, &mut &3_u64.to_ne_bytes()[..], &WriteOptions::new())
///     .unwrap();
/// assert_eq!(written, 8);
///
/// let mut buf = [0_u8; 8];
/// eventfd
///     .read(&ctx, &mut &mut buf[..], &ReadOptions::new())
///     .unwrap();
/// assert_eq!(u64::from_ne_bytes(buf), 1);
/// ```
///
/// [1]: EventFd::release_reference
#[derive(Debug)]
pub struct EventFd {
    counter: Mutex<Counter>,

    // The status flags that cannot change after creation. `NONBLOCK` is kept separately.
    fixed_flags: OpenFlags,
    non_blocking: AtomicBool,

    // Shared with whoever else watches this file. We only register, unregister and notify.
    waiters: Arc<dyn WaiterRegistry>,

    ref_count: RefCount,

    // Read and write calls that currently hold a waiter registration.
    blocked_operations: AtomicUsize,

    owner: Owner,
    id: u64,
}

impl EventFd {
    /// Starts building a new event counter file.
    ///
    /// See [`EventFdBuilder`] for the available settings.
    pub fn builder() -> EventFdBuilder {
        EventFdBuilder::new()
    }

    /// Creates an event counter file the way the `eventfd2()` system call does.
    ///
    /// `flags` may combine `EFD_SEMAPHORE`, `EFD_NONBLOCK` and `EFD_CLOEXEC`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] if `flags` contains any other bit.
    pub fn from_eventfd2(
        initial_value: u32,
        flags: u32,
        waiters: Arc<dyn WaiterRegistry>,
    ) -> Result<Arc<Self>> {
        let flags = EventFdFlags::from_bits(flags).ok_or(Error::InvalidArgument {
            problem: "unknown eventfd2 flags",
        })?;

        Self::builder()
            .initial_value(u64::from(initial_value))
            .semaphore(flags.contains(EventFdFlags::SEMAPHORE))
            .open_flags(flags.open_flags())
            .waiter_registry(waiters)
            .build()
    }

    pub(crate) fn new(
        initial_value: u64,
        semaphore: bool,
        open_flags: OpenFlags,
        waiters: Arc<dyn WaiterRegistry>,
        owner: Owner,
    ) -> Result<Arc<Self>> {
        if initial_value > MAX_COUNTER {
            return Err(Error::InvalidArgument {
                problem: "initial value must be below u64::MAX",
            });
        }

        let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);

        debug!(id, initial_value, semaphore, ?open_flags, "event counter file created");

        Ok(Arc::new(Self {
            counter: Mutex::new(Counter::new(initial_value, semaphore)),
            fixed_flags: open_flags.difference(OpenFlags::MUTABLE),
            non_blocking: AtomicBool::new(open_flags.contains(OpenFlags::NONBLOCK)),
            waiters,
            ref_count: RefCount::new(),
            blocked_operations: AtomicUsize::new(0),
            owner,
            id,
        }))
    }

    /// Reads the counter into `dst`.
    ///
    /// Returns the number of bytes transferred, which is always 8. In normal mode the value
    /// read is the whole counter, which is reset to zero. In semaphore mode the value read is
    /// `1` and the counter is decremented by one.
    ///
    /// If the counter is zero, the call blocks until a write makes it non-zero.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `dst` has room for fewer than 8 bytes.
    /// * [`Error::WouldBlock`] if the counter is zero and the file is non-blocking or
    ///   `options` asks not to wait.
    /// * [`Error::Interrupted`] or [`Error::TimedOut`] if `ctx` was interrupted or its deadline
    ///   passed while blocked. The counter is left untouched.
    /// * [`Error::Fault`] if the value could not be copied to `dst`. The value is lost.
    /// * [`Error::Released`] if the last reference has been released.
    pub fn read(
        &self,
        ctx: &Context,
        dst: &mut dyn ByteSink,
        options: &ReadOptions,
    ) -> Result<usize> {
        self.ensure_not_released()?;

        if dst.num_bytes() < VALUE_SIZE {
            return Err(Error::InvalidArgument {
                problem: "read buffer must have room for 8 bytes",
            });
        }

        let non_blocking = options.is_no_wait() || self.is_non_blocking();
        let value = self.wait_for(ctx, EventMask::READABLE, non_blocking, Counter::try_read)?;

        dst.copy_out(&value.to_ne_bytes())?;

        Ok(VALUE_SIZE)
    }

    /// Adds the 8-byte value in `src` to the counter.
    ///
    /// Returns the number of bytes transferred, which is always 8. If the counter cannot
    /// accept the value without exceeding [`MAX_COUNTER`], the call blocks until reads make
    /// enough room.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `src` does not hold exactly 8 bytes or holds the value
    ///   `u64::MAX`.
    /// * [`Error::WouldBlock`] if the value does not fit and the file is non-blocking or
    ///   `options` asks not to wait.
    /// * [`Error::Interrupted`] or [`Error::TimedOut`] if `ctx` was interrupted or its deadline
    ///   passed while blocked. The counter is left untouched.
    /// * [`Error::Fault`] if the value could not be copied from `src`.
    /// * [`Error::Released`] if the last reference has been released.
    pub fn write(
        &self,
        ctx: &Context,
        src: &mut dyn ByteSource,
        options: &WriteOptions,
    ) -> Result<usize> {
        self.ensure_not_released()?;

        if src.num_bytes() != VALUE_SIZE {
            return Err(Error::InvalidArgument {
                problem: "write buffer must hold exactly 8 bytes",
            });
        }

        let mut buf = [0_u8; VALUE_SIZE];
        src.copy_in(&mut buf)?;

        let value = Self::validate_write_value(u64::from_ne_bytes(buf))?;

        let non_blocking = options.is_no_wait() || self.is_non_blocking();
        self.wait_for(ctx, EventMask::WRITABLE, non_blocking, |counter| {
            counter.try_write(value).then_some(())
        })?;

        Ok(VALUE_SIZE)
    }

    /// Adds `value` to the counter on behalf of the sandbox kernel itself, for example when an
    /// emulated device completes work that a guest waits for.
    ///
    /// Never blocks, regardless of whether the file is in blocking mode.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidArgument`] if `value` is `u64::MAX`.
    /// * [`Error::WouldBlock`] if the counter cannot accept `value`.
    /// * [`Error::Released`] if the last reference has been released.
    pub fn signal(&self, value: u64) -> Result<()> {
        self.ensure_not_released()?;

        let value = Self::validate_write_value(value)?;

        self.try_apply(&mut |counter: &mut Counter| counter.try_write(value).then_some(()))
            .ok_or(Error::WouldBlock)
    }

    /// Returns the `statx()` view of the file. The size is always zero.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Released`] if the last reference has been released.
    pub fn stat(&self, _ctx: &Context, options: &StatOptions) -> Result<Metadata> {
        self.ensure_not_released()?;

        Ok(Metadata::anonymous(self.owner, options.mask()))
    }

    /// Returns the `/proc/[pid]/fdinfo` lines specific to event counter files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Released`] if the last reference has been released.
    pub fn fdinfo(&self) -> Result<String> {
        self.ensure_not_released()?;

        let counter = self.counter.lock().expect(ERR_POISONED_LOCK);

        Ok(format!(
            "eventfd-count: {:16x}\neventfd-id: {}\neventfd-semaphore: {}\n",
            counter.value(),
            self.id,
            u8::from(counter.is_semaphore())
        ))
    }

    /// Returns the subset of `mask` that is currently true.
    #[must_use]
    pub fn readiness(&self, mask: EventMask) -> EventMask {
        self.counter.lock().expect(ERR_POISONED_LOCK).readiness() & mask
    }

    /// Registers `observer` with the waiter registry of this file, to be told about readiness
    /// changes that intersect `interest`.
    pub fn event_register(&self, observer: Arc<dyn Observer>, interest: EventMask) -> WaiterId {
        self.waiters.register(observer, interest)
    }

    /// Removes a registration made via [`event_register()`][Self::event_register].
    ///
    /// Returns `false` if there was no such registration.
    pub fn event_unregister(&self, id: WaiterId) -> bool {
        self.waiters.unregister(id)
    }

    /// Whether reads return `1` instead of draining the counter.
    #[must_use]
    pub fn is_semaphore(&self) -> bool {
        self.counter.lock().expect(ERR_POISONED_LOCK).is_semaphore()
    }

    /// The current file status flags.
    #[must_use]
    pub fn status_flags(&self) -> OpenFlags {
        if self.is_non_blocking() {
            self.fixed_flags | OpenFlags::NONBLOCK
        } else {
            self.fixed_flags
        }
    }

    /// Replaces the changeable status flags (`fcntl(F_SETFL)`). Only
    /// [`OpenFlags::NONBLOCK`] can be changed, other bits in `flags` are ignored.
    pub fn set_status_flags(&self, flags: OpenFlags) {
        self.non_blocking
            .store(flags.contains(OpenFlags::NONBLOCK), Ordering::Relaxed);
    }

    /// Adds a reference, for example when a file descriptor is duplicated.
    ///
    /// # Panics
    ///
    /// Panics if the last reference has already been released.
    pub fn acquire_reference(&self) {
        self.ref_count.inc_ref();
    }

    /// Drops a reference. Returns `true` if this was the last one, in which case the file has
    /// been released and every further operation fails with [`Error::Released`].
    ///
    /// # Panics
    ///
    /// Panics if every reference has already been released.
    pub fn release_reference(&self) -> bool {
        if !self.ref_count.dec_ref() {
            return false;
        }

        self.finalize();
        true
    }

    /// The number of references held.
    #[must_use]
    pub fn ref_count(&self) -> usize {
        self.ref_count.get()
    }

    fn finalize(&self) {
        let blocked = self.blocked_operations.load(Ordering::Acquire);

        if blocked != 0 {
            // Every caller should hold its own reference for the duration of the call. Kick
            // the stragglers so they notice the release and remove their registrations.
            warn!(
                id = self.id,
                blocked, "event counter file released while operations are blocked on it"
            );

            self.waiters.notify(EventMask::all());
        }

        debug!(id = self.id, "event counter file released");
    }

    fn ensure_not_released(&self) -> Result<()> {
        if self.ref_count.is_released() {
            return Err(Error::Released);
        }

        Ok(())
    }

    fn is_non_blocking(&self) -> bool {
        self.non_blocking.load(Ordering::Relaxed)
    }

    fn validate_write_value(value: u64) -> Result<u64> {
        if value == u64::MAX {
            return Err(Error::InvalidArgument {
                problem: "the value u64::MAX cannot be written",
            });
        }

        Ok(value)
    }

    /// Runs `attempt` until it succeeds, blocking between attempts until the counter changes.
    ///
    /// Wake-ups are only hints. Another caller may have consumed the change before we get
    /// the lock again, in which case we block again.
    fn wait_for<T>(
        &self,
        ctx: &Context,
        interest: EventMask,
        non_blocking: bool,
        mut attempt: impl FnMut(&mut Counter) -> Option<T>,
    ) -> Result<T> {
        if let Some(result) = self.try_apply(&mut attempt) {
            return Ok(result);
        }

        if non_blocking {
            return Err(Error::WouldBlock);
        }

        // Counted before registering so that anyone who can see the registration also sees
        // the count.
        self.blocked_operations.fetch_add(1, Ordering::AcqRel);
        let id = self.waiters.register(ctx.waker(), interest);

        // Whatever way we leave, the registration must not outlive the call.
        let _registration = guard(id, |id| {
            self.waiters.unregister(id);
            self.blocked_operations.fetch_sub(1, Ordering::AcqRel);
        });

        loop {
            // We are registered before this check, so a change made right after it still
            // wakes us up.
            if let Some(result) = self.try_apply(&mut attempt) {
                return Ok(result);
            }

            self.ensure_not_released()?;

            trace!(id = self.id, ?interest, "blocking until the counter changes");

            if let Err(e) = ctx.block() {
                trace!(id = self.id, ?interest, error = %e, "gave up waiting");
                return Err(e);
            }
        }
    }

    /// Runs `attempt` under the state lock and, if it changed the counter, broadcasts the new
    /// readiness once the lock is released.
    #[cfg_attr(test, mutants::skip)] // Blocked callers never wake up if tampered.
    fn try_apply<T>(&self, attempt: &mut impl FnMut(&mut Counter) -> Option<T>) -> Option<T> {
        let (result, ready) = {
            let mut counter = self.counter.lock().expect(ERR_POISONED_LOCK);

            let before = counter.value();
            let result = attempt(&mut counter)?;

            let changed = counter.value() != before;
            (result, changed.then(|| counter.readiness()))
        };

        if let Some(ready) = ready {
            self.waiters.notify(ready);
        }

        Some(result)
    }

    #[cfg(test)]
    pub(crate) fn value(&self) -> u64 {
        self.counter.lock().expect(ERR_POISONED_LOCK).value()
    }
}
