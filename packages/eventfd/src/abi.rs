//! Guest-visible Linux ABI values used by the event counter file.
//!
//! These describe the guest's view of the world and are therefore fixed Linux values,
//! independent of whatever platform the sandbox itself runs on.

/// Operation not permitted on a closed or released file.
pub const EBADF: i32 = 9;
/// Interrupted system call.
pub const EINTR: i32 = 4;
/// Resource temporarily unavailable.
pub const EAGAIN: i32 = 11;
/// Bad address.
pub const EFAULT: i32 = 14;
/// Invalid argument.
pub const EINVAL: i32 = 22;
/// Connection timed out. Used for expired blocking deadlines.
pub const ETIMEDOUT: i32 = 110;

/// `eventfd2()` flag: reads decrement the counter by one instead of draining it.
pub const EFD_SEMAPHORE: u32 = 0x1;
/// `eventfd2()` flag: alias of `O_CLOEXEC`.
pub const EFD_CLOEXEC: u32 = O_CLOEXEC;
/// `eventfd2()` flag: alias of `O_NONBLOCK`.
pub const EFD_NONBLOCK: u32 = O_NONBLOCK;

/// Open for reading and writing.
pub const O_RDWR: u32 = 0o2;
/// Non-blocking I/O.
pub const O_NONBLOCK: u32 = 0o4000;
/// Close the descriptor on `execve()`.
pub const O_CLOEXEC: u32 = 0o2_000_000;

/// There is data to read.
pub const POLLIN: u32 = 0x1;
/// Writing is now possible.
pub const POLLOUT: u32 = 0x4;

/// `statx()` mask bit: file type.
pub const STATX_TYPE: u32 = 0x1;
/// `statx()` mask bit: permission bits.
pub const STATX_MODE: u32 = 0x2;
/// `statx()` mask bit: link count.
pub const STATX_NLINK: u32 = 0x4;
/// `statx()` mask bit: owner user.
pub const STATX_UID: u32 = 0x8;
/// `statx()` mask bit: owner group.
pub const STATX_GID: u32 = 0x10;
/// `statx()` mask bit: last access time.
pub const STATX_ATIME: u32 = 0x20;
/// `statx()` mask bit: last modification time.
pub const STATX_MTIME: u32 = 0x40;
/// `statx()` mask bit: last status change time.
pub const STATX_CTIME: u32 = 0x80;
/// `statx()` mask bit: inode number.
pub const STATX_INO: u32 = 0x100;
/// `statx()` mask bit: size in bytes.
pub const STATX_SIZE: u32 = 0x200;
/// `statx()` mask bit: allocated block count.
pub const STATX_BLOCKS: u32 = 0x400;
/// All of the `statx()` fields that `stat()` also provides.
pub const STATX_BASIC_STATS: u32 = 0x7ff;
