//! [`Buffer`] — an owning, growable byte container.
//!
//! Mirrors the capacity/used-size split of a C++ `std::vector<std::byte>`
//! with doubling growth, which is what the reference implementation's
//! `Buffer` class wrapped by hand. A `Buffer` exclusively owns its storage;
//! [`MemoryRange`]/[`MemoryRangeMut`] borrow from it but never outlive it.

use bytemuck::Pod;

use crate::error::Result;
use crate::membuf::range::{MemoryRange, MemoryRangeMut};

/// An owning, growable byte buffer with explicit capacity control.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Buffer {
    data: Vec<u8>,
}

impl Buffer {
    /// An empty buffer with zero capacity.
    pub fn new() -> Self {
        Self { data: Vec::new() }
    }

    /// A zero-filled buffer of exactly `size` bytes, backed by a capacity of
    /// `2 * size`.
    pub fn with_size(size: usize) -> Self {
        let mut data = Vec::with_capacity(size * 2);
        data.resize(size, 0);
        Self { data }
    }

    /// Wrap an existing `Vec<u8>` as a buffer.
    pub fn from_vec(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Number of bytes currently in use.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// `true` if this buffer holds no bytes.
    pub fn empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Current allocated capacity in bytes.
    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Grow or shrink the used prefix to `n` bytes.
    ///
    /// Growing beyond the current capacity doubles it to `2n` first; newly
    /// exposed bytes are zero-filled. The previously-used prefix is always
    /// preserved.
    pub fn resize(&mut self, n: usize) {
        if n > self.data.capacity() {
            self.data.reserve(2 * n - self.data.capacity());
        }
        self.data.resize(n, 0);
    }

    /// Shrink capacity to exactly the used size.
    pub fn shrink(&mut self) {
        self.data.shrink_to_fit();
    }

    /// Release all storage, resetting both used size and capacity to zero.
    pub fn clear(&mut self) {
        self.data = Vec::new();
    }

    /// Append `bytes` to the end of the buffer, growing as needed.
    pub fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Borrow this buffer's used prefix as a read-only [`MemoryRange`].
    pub fn as_range(&self) -> MemoryRange<'_> {
        MemoryRange::new(&self.data)
    }

    /// Borrow this buffer's used prefix as a mutable [`MemoryRangeMut`].
    pub fn as_range_mut(&mut self) -> MemoryRangeMut<'_> {
        MemoryRangeMut::new(&mut self.data)
    }

    /// Raw byte slice backing the used prefix.
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Mutable raw byte slice backing the used prefix.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Consume the buffer, returning its backing storage.
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// 64-bit integrity hash of the used prefix. See [`crate::hash`].
    pub fn hash(&self) -> u64 {
        self.as_range().hash()
    }

    /// Copy `len` bytes starting at `offset` into `dst`.
    pub fn read_raw(&self, dst: &mut [u8], len: usize, offset: usize) -> Result<()> {
        self.as_range().read_raw(dst, len, offset)
    }

    /// Copy `src` into the buffer starting at `offset`.
    pub fn write_raw(&mut self, src: &[u8], offset: usize) -> Result<()> {
        self.as_range_mut().write_raw(src, offset)
    }

    /// Read a `Pod` value of type `T` at `offset`.
    pub fn read_as<T: Pod>(&self, offset: usize) -> Result<T> {
        self.as_range().read_as(offset)
    }

    /// Write a `Pod` value of type `T` at `offset`, byte-for-byte.
    pub fn write_as<T: Pod>(&mut self, value: T, offset: usize) -> Result<()> {
        self.as_range_mut().write_as(value, offset)
    }
}

impl<'a> From<&'a Buffer> for MemoryRange<'a> {
    fn from(buf: &'a Buffer) -> Self {
        buf.as_range()
    }
}

impl From<Vec<u8>> for Buffer {
    fn from(data: Vec<u8>) -> Self {
        Self::from_vec(data)
    }
}
