//! End-to-end signaling between guest threads through event counter files, observed the way a
//! poller would observe them.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use eventfd::{
    Context, Error, EventFd, EventMask, Observer, ReadOptions, StatOptions, WaiterQueue,
    WaiterRegistry, WriteOptions, abi,
};

#[derive(Debug, Default)]
struct RecordingObserver {
    broadcasts: Mutex<Vec<EventMask>>,
}

impl RecordingObserver {
    fn broadcasts(&self) -> Vec<EventMask> {
        self.broadcasts.lock().unwrap().clone()
    }
}

impl Observer for RecordingObserver {
    fn on_events(&self, ready: EventMask) {
        self.broadcasts.lock().unwrap().push(ready);
    }
}

fn write(eventfd: &EventFd, ctx: &Context, value: u64) -> eventfd::Result<usize> {
    eventfd.write(ctx, &mut &value.to_ne_bytes()[..], &WriteOptions::new())
}

fn read(eventfd: &EventFd, ctx: &Context) -> eventfd::Result<u64> {
    let mut buf = [0_u8; 8];
    let transferred = eventfd.read(ctx, &mut &mut buf[..], &ReadOptions::new())?;

    assert_eq!(transferred, 8);
    Ok(u64::from_ne_bytes(buf))
}

fn with_queue() -> (Arc<EventFd>, Arc<WaiterQueue>) {
    let queue = Arc::new(WaiterQueue::new());

    let eventfd = EventFd::builder()
        .waiter_registry(Arc::clone(&queue) as Arc<dyn WaiterRegistry>)
        .build()
        .unwrap();

    (eventfd, queue)
}

#[test]
fn ping_pong_between_threads() {
    const ROUNDS: u64 = 100;

    let ping = EventFd::builder().build().unwrap();
    let pong = EventFd::builder().build().unwrap();

    let responder = thread::spawn({
        let ping = Arc::clone(&ping);
        let pong = Arc::clone(&pong);

        move || {
            let ctx = Context::new().with_timeout(Duration::from_secs(10));

            for _ in 0..ROUNDS {
                let value = read(&ping, &ctx).unwrap();
                write(&pong, &ctx, value + 1).unwrap();
            }
        }
    });

    let ctx = Context::new().with_timeout(Duration::from_secs(10));

    for round in 0..ROUNDS {
        write(&ping, &ctx, round + 1).unwrap();
        assert_eq!(read(&pong, &ctx).unwrap(), round + 2);
    }

    responder.join().unwrap();
}

#[test]
fn poller_sees_every_write() {
    let (eventfd, _queue) = with_queue();
    let observer = Arc::new(RecordingObserver::default());

    eventfd.event_register(
        Arc::clone(&observer) as Arc<dyn Observer>,
        EventMask::READABLE,
    );

    let ctx = Context::new();
    write(&eventfd, &ctx, 124).unwrap();
    write(&eventfd, &ctx, 1).unwrap();

    assert_eq!(
        observer.broadcasts(),
        vec![EventMask::READABLE | EventMask::WRITABLE; 2]
    );
}

#[test]
fn counter_is_conserved_across_many_writers() {
    const WRITERS: u64 = 8;
    const WRITES_PER_WRITER: u64 = 250;

    let eventfd = EventFd::builder().build().unwrap();
    let total_read = Arc::new(AtomicUsize::new(0));

    let writers: Vec<_> = (0..WRITERS)
        .map(|_| {
            let eventfd = Arc::clone(&eventfd);

            thread::spawn(move || {
                let ctx = Context::new();

                for _ in 0..WRITES_PER_WRITER {
                    write(&eventfd, &ctx, 1).unwrap();
                }
            })
        })
        .collect();

    let reader = thread::spawn({
        let eventfd = Arc::clone(&eventfd);
        let total_read = Arc::clone(&total_read);

        move || {
            let expected = usize::try_from(WRITERS * WRITES_PER_WRITER).unwrap();
            let ctx = Context::new().with_timeout(Duration::from_secs(10));

            while total_read.load(Ordering::Relaxed) < expected {
                let value = read(&eventfd, &ctx).unwrap();
                total_read.fetch_add(usize::try_from(value).unwrap(), Ordering::Relaxed);
            }
        }
    });

    for writer in writers {
        writer.join().unwrap();
    }

    reader.join().unwrap();

    assert_eq!(
        total_read.load(Ordering::Relaxed),
        usize::try_from(WRITERS * WRITES_PER_WRITER).unwrap()
    );
}

#[test]
fn nonblocking_eventfd2_never_blocks() {
    let queue: Arc<dyn WaiterRegistry> = Arc::new(WaiterQueue::new());
    let eventfd = EventFd::from_eventfd2(0, abi::EFD_NONBLOCK, queue).unwrap();

    let error = read(&eventfd, &Context::new()).unwrap_err();

    assert!(matches!(error, Error::WouldBlock));
    assert_eq!(error.errno(), abi::EAGAIN);
}

#[test]
fn deadline_expires_without_side_effects() {
    let (eventfd, queue) = with_queue();
    let ctx = Context::new().with_timeout(Duration::from_millis(20));

    let error = read(&eventfd, &ctx).unwrap_err();

    assert!(matches!(error, Error::TimedOut));
    assert_eq!(error.errno(), abi::ETIMEDOUT);
    assert!(queue.is_empty());
    assert!(eventfd.fdinfo().unwrap().starts_with("eventfd-count:                0\n"));
}

#[test]
fn dup_and_close_lifecycle() {
    let eventfd = EventFd::builder().initial_value(1).build().unwrap();

    // dup()
    eventfd.acquire_reference();

    // close() of the original descriptor.
    assert!(!eventfd.release_reference());

    let ctx = Context::new();
    assert_eq!(read(&eventfd, &ctx).unwrap(), 1);

    let metadata = eventfd.stat(&ctx, &StatOptions::default()).unwrap();
    assert_eq!(metadata.size, 0);

    // close() of the duplicate.
    assert!(eventfd.release_reference());

    let error = write(&eventfd, &ctx, 1).unwrap_err();
    assert_eq!(error.errno(), abi::EBADF);
}
