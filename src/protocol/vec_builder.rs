//! Helper to build [`Vec`]s from untrusted length prefixes.
//!
//! Member user data arrives as opaque bytes from peers, so a length prefix
//! must not be trusted to size an allocation up front. [`VecBuilder`] caps
//! the initial capacity and only grows once the data actually arrives.

use std::io::Read;

use super::traits::CodecError;

/// Soft limit for up-front allocations, in bytes.
const SOFT_ALLOCATION_LIMIT: usize = 1024 * 1024;

/// Chunk size for guarded byte reads.
const READ_CHUNK: usize = 4096;

#[derive(Debug)]
pub struct VecBuilder<T> {
    inner: Vec<T>,
    expected: usize,
}

impl<T> VecBuilder<T> {
    pub fn new(expected: usize) -> Self {
        let element = std::mem::size_of::<T>().max(1);
        Self {
            inner: Vec::with_capacity(expected.min(SOFT_ALLOCATION_LIMIT / element)),
            expected,
        }
    }

    pub fn push(&mut self, value: T) {
        self.inner.push(value);
    }
}

impl VecBuilder<u8> {
    /// Reads exactly the expected number of bytes, in bounded chunks.
    ///
    /// A truncated input surfaces as [`CodecError::IO`] before the full
    /// claimed length has been allocated.
    pub fn read_exact<R>(mut self, reader: &mut R) -> Result<Self, CodecError>
    where
        R: Read,
    {
        let mut remaining = self.expected.saturating_sub(self.inner.len());
        while remaining > 0 {
            let chunk = remaining.min(READ_CHUNK);
            let start = self.inner.len();
            self.inner.resize(start + chunk, 0);
            reader.read_exact(&mut self.inner[start..])?;
            remaining -= chunk;
        }
        Ok(self)
    }
}

impl<T> From<VecBuilder<T>> for Vec<T> {
    fn from(builder: VecBuilder<T>) -> Self {
        builder.inner
    }
}
