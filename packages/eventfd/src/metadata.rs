use crate::abi;

/// Block size reported for event counter files: one guest page.
pub const BLOCK_SIZE: u32 = 4096;

/// Permission bits reported for event counter files. There are no file type bits because the
/// file lives on an anonymous inode.
pub const MODE: u16 = 0o600;

/// A point in time as seen by `statx()`.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[non_exhaustive]
pub struct Timestamp {
    /// Seconds since the Unix epoch.
    pub sec: i64,

    /// Nanoseconds within the second.
    pub nsec: u32,
}

/// Owner of an event counter file, taken from the credentials of its creator.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub(crate) struct Owner {
    pub(crate) uid: u32,
    pub(crate) gid: u32,
}

/// The `statx()` view of an event counter file.
///
/// An event counter file is a control object with no byte stream behind it, so its size is
/// always zero and every other field has a fixed value. Timestamps are all zero.
#[derive(Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub struct Metadata {
    /// The `STATX_*` bits of the fields that are filled in.
    pub mask: u32,

    /// Preferred I/O block size.
    pub blksize: u32,

    /// Number of hard links.
    pub nlink: u32,

    /// Owning user.
    pub uid: u32,

    /// Owning group.
    pub gid: u32,

    /// File type and permission bits.
    pub mode: u16,

    /// Inode number.
    pub ino: u64,

    /// Size in bytes. Always zero.
    pub size: u64,

    /// Allocated 512-byte blocks. Always zero.
    pub blocks: u64,

    /// Last access.
    pub atime: Timestamp,

    /// Last status change.
    pub ctime: Timestamp,

    /// Last modification.
    pub mtime: Timestamp,

    /// Major number of the device holding the inode.
    pub dev_major: u32,

    /// Minor number of the device holding the inode.
    pub dev_minor: u32,
}

impl Metadata {
    // All anonymous files share one inode on one unnamed device.
    const ANON_INO: u64 = 1;

    pub(crate) fn anonymous(owner: Owner, requested_mask: u32) -> Self {
        Self {
            mask: requested_mask & abi::STATX_BASIC_STATS,
            blksize: BLOCK_SIZE,
            nlink: 1,
            uid: owner.uid,
            gid: owner.gid,
            mode: MODE,
            ino: Self::ANON_INO,
            size: 0,
            blocks: 0,
            atime: Timestamp::default(),
            ctime: Timestamp::default(),
            mtime: Timestamp::default(),
            dev_major: 0,
            dev_minor: 0,
        }
    }
}
