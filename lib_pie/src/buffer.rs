use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferError {
    #[error("Buffer overflow: writing {needed} bytes at offset {offset} exceeds capacity of {capacity}")]
    Overflow {
        offset: usize,
        needed: usize,
        capacity: usize,
    },
    #[error("Patch of {len} bytes at offset {offset} lies outside the {written} bytes written so far")]
    PatchOutOfRange {
        offset: usize,
        len: usize,
        written: usize,
    },
}

/// Bounds-checked append cursor over a caller-owned byte region.
///
/// A write that would cross the end of the region fails before touching any byte.
pub struct ByteWriter<'a> {
    buffer: &'a mut [u8],
    position: usize,
}

impl<'a> ByteWriter<'a> {
    pub fn new(buffer: &'a mut [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    /// Bytes written so far.
    pub fn written(&self) -> &[u8] {
        &self.buffer[..self.position]
    }

    /// Claims the next `len` bytes and advances the cursor past them.
    fn claim(&mut self, len: usize) -> Result<&mut [u8], BufferError> {
        if len > self.remaining() {
            return Err(BufferError::Overflow {
                offset: self.position,
                needed: len,
                capacity: self.buffer.len(),
            });
        }

        let start = self.position;
        self.position += len;
        Ok(&mut self.buffer[start..self.position])
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<(), BufferError> {
        self.claim(bytes.len())?.copy_from_slice(bytes);
        Ok(())
    }

    pub fn write_u8(&mut self, value: u8) -> Result<(), BufferError> {
        self.claim(1)?[0] = value;
        Ok(())
    }

    pub fn write_u16_le(&mut self, value: u16) -> Result<(), BufferError> {
        LittleEndian::write_u16(self.claim(2)?, value);
        Ok(())
    }

    pub fn write_u32_le(&mut self, value: u32) -> Result<(), BufferError> {
        LittleEndian::write_u32(self.claim(4)?, value);
        Ok(())
    }

    /// Overwrites a `u32` that was already written at `offset`.
    pub fn patch_u32_le(&mut self, offset: usize, value: u32) -> Result<(), BufferError> {
        let end = offset.checked_add(4).filter(|&end| end <= self.position);
        let Some(end) = end else {
            return Err(BufferError::PatchOutOfRange {
                offset,
                len: 4,
                written: self.position,
            });
        };

        LittleEndian::write_u32(&mut self.buffer[offset..end], value);
        Ok(())
    }

    /// Zeroes everything written so far and rewinds to the start.
    pub fn discard(&mut self) {
        self.buffer[..self.position].fill(0);
        self.position = 0;
    }

    /// Consumes the writer and returns the number of bytes written.
    pub fn finish(self) -> usize {
        self.position
    }
}
