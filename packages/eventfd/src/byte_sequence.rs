//! Movement of bytes between guest memory and the event counter file.
//!
//! The sandbox's memory manager provides the real implementations of these traits. Plain byte
//! slices and vectors implement them too, which is what kernel-internal callers and tests use.

use std::mem;

use crate::{Error, Result};

/// A sequence of bytes the event counter file can copy data in from (a `write()` source).
pub trait ByteSource {
    /// Number of bytes remaining in the sequence.
    fn num_bytes(&self) -> usize;

    /// Copies the first `dst.len()` bytes of the sequence into `dst`, returning the number of
    /// bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fault`] if the underlying memory is not accessible.
    fn copy_in(&mut self, dst: &mut [u8]) -> Result<usize>;
}

/// A sequence of bytes the event counter file can copy data out to (a `read()` destination).
pub trait ByteSink {
    /// Number of bytes of capacity remaining in the sequence.
    fn num_bytes(&self) -> usize;

    /// Copies `src` into the start of the sequence, returning the number of bytes copied.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fault`] if the underlying memory is not accessible.
    fn copy_out(&mut self, src: &[u8]) -> Result<usize>;
}

impl ByteSource for &[u8] {
    fn num_bytes(&self) -> usize {
        self.len()
    }

    fn copy_in(&mut self, dst: &mut [u8]) -> Result<usize> {
        let (head, tail) = self.split_at_checked(dst.len()).ok_or(Error::Fault)?;

        dst.copy_from_slice(head);
        *self = tail;

        Ok(dst.len())
    }
}

impl ByteSource for Vec<u8> {
    fn num_bytes(&self) -> usize {
        self.len()
    }

    fn copy_in(&mut self, dst: &mut [u8]) -> Result<usize> {
        let mut remaining = self.as_slice();
        let copied = remaining.copy_in(dst)?;

        self.drain(..copied);

        Ok(copied)
    }
}

impl ByteSink for &mut [u8] {
    fn num_bytes(&self) -> usize {
        self.len()
    }

    fn copy_out(&mut self, src: &[u8]) -> Result<usize> {
        let len = src.len();

        if len > self.len() {
            return Err(Error::Fault);
        }

        let (head, tail) = mem::take(self).split_at_mut(len);

        head.copy_from_slice(src);
        *self = tail;

        Ok(len)
    }
}
