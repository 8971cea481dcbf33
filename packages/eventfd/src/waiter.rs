//! The waiter subsystem contract and a queue-based implementation of it.
//!
//! An event counter file never keeps a list of interested parties itself. It registers
//! observers with a [`WaiterRegistry`] and broadcasts its readiness after every state change,
//! leaving it to the registry to decide which observers care.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use smallvec::SmallVec;

use crate::EventMask;
use crate::constants::ERR_POISONED_LOCK;

/// Receives readiness broadcasts from a [`WaiterRegistry`].
#[cfg_attr(test, mockall::automock)]
pub trait Observer: Debug + Send + Sync {
    /// Called with the full readiness mask of the event source whenever it broadcasts a mask
    /// that intersects the interest this observer was registered with.
    ///
    /// This is called without any event counter file or registry lock held. Implementations
    /// must be quick and must not block.
    fn on_events(&self, ready: EventMask);
}

/// Identifies one registration with a [`WaiterRegistry`].
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct WaiterId(u64);

/// Stores observer registrations and delivers readiness broadcasts to them.
#[cfg_attr(test, mockall::automock)]
pub trait WaiterRegistry: Debug + Send + Sync {
    /// Registers `observer` to be told about broadcasts that intersect `interest`.
    fn register(&self, observer: Arc<dyn Observer>, interest: EventMask) -> WaiterId;

    /// Removes a registration. Returns `false` if there was no such registration.
    fn unregister(&self, id: WaiterId) -> bool;

    /// Broadcasts the current readiness of the event source.
    fn notify(&self, ready: EventMask);
}

#[derive(Debug)]
struct Registration {
    id: WaiterId,
    interest: EventMask,
    observer: Arc<dyn Observer>,
}

/// A [`WaiterRegistry`] that keeps registrations in a list and calls every observer whose
/// interest intersects a broadcast mask.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
///
/// use eventfd::{EventMask, WaiterQueue, WaiterRegistry};
///
/// let queue = Arc::new(WaiterQueue::new());
/// queue.notify(EventMask::READABLE); // Nobody is listening, so nothing happens.
/// assert!(queue.is_empty());
/// ```
#[derive(Debug, Default)]
pub struct WaiterQueue {
    registrations: Mutex<Vec<Registration>>,
    next_id: AtomicU64,
}

// Observers are collected under the lock and called after it is released. Most event sources
// have a handful of waiters at most.
type ObserverSnapshot = SmallVec<[Arc<dyn Observer>; 4]>;

impl WaiterQueue {
    /// Creates an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of active registrations.
    #[must_use]
    pub fn len(&self) -> usize {
        self.registrations.lock().expect(ERR_POISONED_LOCK).len()
    }

    /// Whether there are no active registrations.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl WaiterRegistry for WaiterQueue {
    fn register(&self, observer: Arc<dyn Observer>, interest: EventMask) -> WaiterId {
        let id = WaiterId(self.next_id.fetch_add(1, Ordering::Relaxed));

        self.registrations
            .lock()
            .expect(ERR_POISONED_LOCK)
            .push(Registration {
                id,
                interest,
                observer,
            });

        id
    }

    fn unregister(&self, id: WaiterId) -> bool {
        let mut registrations = self.registrations.lock().expect(ERR_POISONED_LOCK);

        let before = registrations.len();
        registrations.retain(|r| r.id != id);

        registrations.len() != before
    }

    #[cfg_attr(test, mutants::skip)] // Blocked callers never wake up if tampered.
    fn notify(&self, ready: EventMask) {
        let observers: ObserverSnapshot = self
            .registrations
            .lock()
            .expect(ERR_POISONED_LOCK)
            .iter()
            .filter(|r| r.interest.intersects(ready))
            .map(|r| Arc::clone(&r.observer))
            .collect();

        // Observers may call back into us (e.g. to unregister), so the lock must be released.
        for observer in observers {
            observer.on_events(ready);
        }
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use mockall::predicate::eq;
    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(WaiterQueue: Send, Sync);
    assert_impl_all!(WaiterId: Send, Sync, Copy);

    #[test]
    fn notifies_interested_observer() {
        let queue = WaiterQueue::new();

        let mut observer = MockObserver::new();
        observer
            .expect_on_events()
            .with(eq(EventMask::READABLE | EventMask::WRITABLE))
            .times(1)
            .return_const(());

        queue.register(Arc::new(observer), EventMask::READABLE);
        queue.notify(EventMask::READABLE | EventMask::WRITABLE);
    }

    #[test]
    fn skips_uninterested_observer() {
        let queue = WaiterQueue::new();

        let mut observer = MockObserver::new();
        observer.expect_on_events().never();

        queue.register(Arc::new(observer), EventMask::READABLE);
        queue.notify(EventMask::WRITABLE);
    }

    #[test]
    fn unregistered_observer_is_not_notified() {
        let queue = WaiterQueue::new();

        let mut observer = MockObserver::new();
        observer.expect_on_events().never();

        let id = queue.register(Arc::new(observer), EventMask::all());
        assert_eq!(queue.len(), 1);

        assert!(queue.unregister(id));
        assert!(queue.is_empty());

        queue.notify(EventMask::all());
    }

    #[test]
    fn unregister_unknown_id_returns_false() {
        let queue = WaiterQueue::new();

        let mut observer = MockObserver::new();
        observer.expect_on_events().return_const(());

        let id = queue.register(Arc::new(observer), EventMask::READABLE);
        assert!(queue.unregister(id));
        assert!(!queue.unregister(id));
    }

    #[test]
    fn ids_are_unique() {
        let queue = WaiterQueue::new();

        let first = queue.register(Arc::new(MockObserver::new()), EventMask::READABLE);
        let second = queue.register(Arc::new(MockObserver::new()), EventMask::READABLE);

        assert_ne!(first, second);
        assert_eq!(queue.len(), 2);
    }

    #[derive(Debug)]
    struct SelfRemovingObserver {
        queue: Arc<WaiterQueue>,
        id: Mutex<Option<WaiterId>>,
    }

    impl Observer for SelfRemovingObserver {
        fn on_events(&self, _ready: EventMask) {
            if let Some(id) = self.id.lock().unwrap().take() {
                assert!(self.queue.unregister(id));
            }
        }
    }

    #[test]
    fn observer_may_unregister_itself_during_notify() {
        let queue = Arc::new(WaiterQueue::new());

        let observer = Arc::new(SelfRemovingObserver {
            queue: Arc::clone(&queue),
            id: Mutex::new(None),
        });

        let id = queue.register(Arc::clone(&observer) as Arc<dyn Observer>, EventMask::all());
        *observer.id.lock().unwrap() = Some(id);

        queue.notify(EventMask::READABLE);

        assert!(queue.is_empty());
    }
}
