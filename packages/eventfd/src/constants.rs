// A poisoned lock means the process is in an unrecoverable/unsafe state and must exit (we panic).
pub(crate) const ERR_POISONED_LOCK: &str = "encountered poisoned lock - continued execution \
    is not safe because we can no longer ensure that guest-visible counter state is consistent";

/// The largest value the counter may hold.
///
/// `u64::MAX` is reserved as a sentinel and is never observable as a counter value.
pub const MAX_COUNTER: u64 = u64::MAX - 1;

/// Every successful read or write transfers exactly this many bytes.
pub const VALUE_SIZE: usize = size_of::<u64>();
