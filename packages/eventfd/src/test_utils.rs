//! Helpers shared by the test modules of this crate.

use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use crate::{Context, EventFd, ReadOptions, Result, WaiterQueue, WriteOptions};

/// Runs a test on a separate thread and panics if it does not finish within 10 seconds.
///
/// Blocking operations that are never woken up would otherwise hang the test run forever.
pub(crate) fn with_watchdog<F, R>(test_fn: F) -> R
where
    F: FnOnce() -> R + Send + 'static,
    R: Send + 'static,
{
    let (tx, rx) = mpsc::channel();

    let test_handle = thread::spawn(move || {
        let result = test_fn();
        // If the receiver is gone, the watchdog already fired.
        drop(tx.send(result));
    });

    match rx.recv_timeout(Duration::from_secs(10)) {
        Ok(result) => {
            test_handle.join().expect("test thread should not panic");
            result
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            panic!("test exceeded 10-second timeout - a blocked caller was likely never woken up");
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => match test_handle.join() {
            Ok(()) => panic!("test thread disconnected unexpectedly"),
            Err(e) => std::panic::resume_unwind(e),
        },
    }
}

/// Writes `value` as the guest would, with an 8-byte buffer in native byte order.
pub(crate) fn write_value(eventfd: &EventFd, ctx: &Context, value: u64) -> Result<usize> {
    eventfd.write(ctx, &mut &value.to_ne_bytes()[..], &WriteOptions::new())
}

/// Reads from `eventfd` as the guest would and decodes the value.
pub(crate) fn read_value(eventfd: &EventFd, ctx: &Context) -> Result<u64> {
    let mut buf = [0_u8; 8];

    let read = eventfd.read(ctx, &mut &mut buf[..], &ReadOptions::new())?;
    assert_eq!(read, 8);

    Ok(u64::from_ne_bytes(buf))
}

/// Waits until `count` callers have registered with `queue`, which blocked readers and writers
/// do right before they go to sleep.
pub(crate) fn wait_until_blocked(queue: &WaiterQueue, count: usize) {
    while queue.len() < count {
        thread::sleep(Duration::from_millis(1));
    }
}
