#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! Event counter files for user-space sandbox kernels.
//!
//! An event counter file is the object behind the Linux `eventfd()` and `eventfd2()` system
//! calls: a 64-bit counter that guest processes and threads use to signal each other and that
//! can be polled as a wakeup source. This crate reproduces the behavior guests observe on a
//! real kernel:
//!
//! * Reads and writes always transfer exactly 8 bytes.
//! * A write adds to the counter. It blocks (or fails with [`Error::WouldBlock`]) rather than
//!   take the counter past [`MAX_COUNTER`], which is `u64::MAX - 1`.
//! * A read drains the counter or, in semaphore mode, takes one unit from it. It blocks (or
//!   fails with [`Error::WouldBlock`]) while the counter is zero.
//! * Every change of the counter broadcasts the file's [`EventMask`] to its
//!   [`WaiterRegistry`], which tells interested [`Observer`]s.
//!
//! # Collaborators
//!
//! The event counter file only calls into the rest of the sandbox through small contracts:
//!
//! * [`WaiterRegistry`] stores observer registrations and delivers broadcasts.
//!   [`WaiterQueue`] is a simple implementation.
//! * [`ByteSource`] and [`ByteSink`] move data from and to guest memory. Byte slices
//!   implement them.
//! * [`Context`] is where a blocked caller parks. It carries the caller's deadline and can be
//!   interrupted via an [`Interrupter`].
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use std::thread;
//!
//! use eventfd::{Context, EventFd, ReadOptions, WriteOptions};
//!
//! let eventfd = EventFd::builder().build().unwrap();
//!
//! let reader = thread::spawn({
//!     let eventfd = Arc::clone(&eventfd);
//!
//!     move || {
//!         let mut buf = [0_u8; 8];
//!
//!         // Blocks until the main thread writes.
//!         eventfd
//!             .read(&Context::new(), &mut &mut buf[..], &ReadOptions::new())
//!             .unwrap();
//!
//!         u64::from_ne_bytes(buf)
//!     }
//! });
//!
//! eventfd
//!     .write(&Context::new(), &mut &7_u64.to_ne_bytes()[..], &WriteOptions::new())
//!     .unwrap();
//!
//! assert_eq!(reader.join().unwrap(), 7);
//! ```

pub mod abi;
mod byte_sequence;
mod constants;
mod context;
mod counter;
mod error;
mod event_fd;
mod event_fd_builder;
mod flags;
mod metadata;
mod options;
mod ref_count;
mod waiter;

#[cfg(test)]
mod test_utils;

pub use byte_sequence::*;
pub use constants::{MAX_COUNTER, VALUE_SIZE};
pub use context::*;
pub use error::*;
pub use event_fd::*;
pub use event_fd_builder::*;
pub use flags::*;
pub use metadata::{BLOCK_SIZE, MODE, Metadata, Timestamp};
pub use options::*;
pub use waiter::*;
