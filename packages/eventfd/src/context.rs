//! The calling context of a guest operation: where a blocked caller parks, how it is
//! interrupted and when it gives up.

use std::sync::{Arc, Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::constants::ERR_POISONED_LOCK;
use crate::{Error, EventMask, Observer, Result};

#[derive(Debug, Default)]
struct WakeState {
    // An observed readiness change has not yet been consumed by `block()`.
    notified: bool,

    // An interruption has not yet been consumed by `block()`.
    interrupted: bool,
}

#[derive(Debug, Default)]
struct Parker {
    state: Mutex<WakeState>,
    condvar: Condvar,
}

impl Parker {
    fn wake(&self, apply: impl FnOnce(&mut WakeState)) {
        apply(&mut self.state.lock().expect(ERR_POISONED_LOCK));

        // Only the thread that owns the context ever waits here.
        self.condvar.notify_one();
    }
}

impl Observer for Parker {
    fn on_events(&self, _ready: EventMask) {
        self.wake(|state| state.notified = true);
    }
}

/// The context a guest thread passes into operations that may block.
///
/// A context belongs to one thread of execution and is used for one blocking operation at a
/// time. It carries an optional deadline and can be interrupted from other threads through an
/// [`Interrupter`], which makes a blocked operation fail with
/// [`Error::Interrupted`][crate::Error::Interrupted].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
///
/// use eventfd::{Context, Error, EventFd, ReadOptions};
///
/// let eventfd = EventFd::builder().build().unwrap();
/// let ctx = Context::new().with_timeout(Duration::from_millis(10));
///
/// let mut buf = [0_u8; 8];
/// let result = eventfd.read(&ctx, &mut &mut buf[..], &ReadOptions::new());
/// assert!(matches!(result, Err(Error::TimedOut)));
/// ```
#[derive(Debug, Default)]
pub struct Context {
    parker: Arc<Parker>,
    deadline: Option<Instant>,
}

impl Context {
    /// Creates a context without a deadline.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Blocking operations fail with [`Error::TimedOut`][crate::Error::TimedOut] once
    /// `deadline` has passed.
    #[must_use]
    pub fn with_deadline(self, deadline: Instant) -> Self {
        Self {
            deadline: Some(deadline),
            ..self
        }
    }

    /// Blocking operations fail with [`Error::TimedOut`][crate::Error::TimedOut] once `timeout`
    /// has elapsed, measured from now.
    ///
    /// A timeout too large to represent means no deadline at all.
    #[must_use]
    pub fn with_timeout(self, timeout: Duration) -> Self {
        Self {
            deadline: Instant::now().checked_add(timeout),
            ..self
        }
    }

    /// The deadline of blocking operations, if any.
    #[must_use]
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Returns a handle that can interrupt this context from another thread.
    #[must_use]
    pub fn interrupter(&self) -> Interrupter {
        Interrupter {
            parker: Arc::clone(&self.parker),
        }
    }

    /// Returns the observer to register with a waiter registry before blocking.
    ///
    /// Any readiness change observed by a previous registration is forgotten. Pending
    /// interruptions are kept.
    pub(crate) fn waker(&self) -> Arc<dyn Observer> {
        self.parker.state.lock().expect(ERR_POISONED_LOCK).notified = false;

        Arc::<Parker>::clone(&self.parker)
    }

    /// Parks the calling thread until the waker observes a readiness change, the context is
    /// interrupted or the deadline passes.
    ///
    /// Waking up only means that something changed. The caller must re-check its condition.
    #[cfg_attr(test, mutants::skip)] // Tests hang if tampered.
    pub(crate) fn block(&self) -> Result<()> {
        let mut state = self.parker.state.lock().expect(ERR_POISONED_LOCK);

        loop {
            if state.interrupted {
                state.interrupted = false;
                return Err(Error::Interrupted);
            }

            if state.notified {
                state.notified = false;
                return Ok(());
            }

            state = match self.deadline {
                None => self.parker.condvar.wait(state).expect(ERR_POISONED_LOCK),
                Some(deadline) => {
                    let remaining = deadline
                        .checked_duration_since(Instant::now())
                        .filter(|remaining| !remaining.is_zero())
                        .ok_or(Error::TimedOut)?;

                    self.parker
                        .condvar
                        .wait_timeout(state, remaining)
                        .expect(ERR_POISONED_LOCK)
                        .0
                }
            };
        }
    }
}

/// Interrupts the blocking operation of a [`Context`], like a signal sent to a guest thread.
///
/// If the context is not blocked, the interruption stays pending and the next blocking
/// operation fails immediately.
#[derive(Clone, Debug)]
pub struct Interrupter {
    parker: Arc<Parker>,
}

impl Interrupter {
    /// Interrupts the context this handle was obtained from.
    pub fn interrupt(&self) {
        self.parker.wake(|state| state.interrupted = true);
    }
}
