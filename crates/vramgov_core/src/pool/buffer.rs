//! Growable byte buffer handed out by the pool.

/// A reusable byte arena with a write cursor.
///
/// Writes past the end grow the buffer (to double its size, or to exactly
/// fit the write if that is larger) and keep every byte already written.
#[derive(Debug)]
pub struct CommandBuffer {
    data: Vec<u8>,
    position: usize,
    allocation_id: u64,
}

impl CommandBuffer {
    pub(super) fn new(size: usize, allocation_id: u64) -> Self {
        Self {
            data: vec![0; size],
            position: 0,
            allocation_id,
        }
    }

    /// Rewinds the cursor. The allocation is kept.
    #[inline]
    pub fn reset(&mut self) {
        self.position = 0;
    }

    /// Appends raw bytes at the cursor, growing if needed.
    pub fn write(&mut self, bytes: &[u8]) {
        if !self.has_space(bytes.len()) {
            let new_size = (self.data.len() * 2).max(self.position + bytes.len());
            self.data.resize(new_size, 0);
            tracing::debug!("CommandBuffer auto-expanded to {} bytes", new_size);
        }

        let end = self.position + bytes.len();
        self.data[self.position..end].copy_from_slice(bytes);
        self.position = end;
    }

    /// Appends the byte representation of a plain-old-data value.
    #[inline]
    pub fn write_value<T: bytemuck::Pod>(&mut self, value: &T) {
        self.write(bytemuck::bytes_of(value));
    }

    /// Grows the buffer to at least `size` bytes without moving the cursor.
    pub fn reserve(&mut self, size: usize) {
        if self.data.len() < size {
            self.data.resize(size, 0);
        }
    }

    /// Returns true if `size` more bytes fit without growing.
    #[inline]
    #[must_use]
    pub fn has_space(&self, size: usize) -> bool {
        self.position + size <= self.data.len()
    }

    /// Bytes left before the next write grows the buffer.
    #[inline]
    #[must_use]
    pub fn remaining_space(&self) -> usize {
        self.data.len() - self.position
    }

    /// Current cursor offset.
    #[inline]
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }

    /// Current size of the arena in bytes.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.data.len()
    }

    /// The bytes written since the last reset.
    #[inline]
    #[must_use]
    pub fn written(&self) -> &[u8] {
        &self.data[..self.position]
    }

    /// The whole arena, including bytes past the cursor.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Diagnostic allocation identifier, unique per pool.
    #[inline]
    #[must_use]
    pub const fn allocation_id(&self) -> u64 {
        self.allocation_id
    }
}
