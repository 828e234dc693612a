use crate::error::{CodecError, Result};

/// Bounds-checked reader over a fixed byte buffer.
///
/// Every read either returns exactly the requested number of bytes or fails
/// with the remaining and requested sizes. Nothing is truncated or padded.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            buffer,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.position
    }

    pub fn has_remaining(&self) -> bool {
        self.remaining() > 0
    }

    /// Reads a slice of `len` bytes, borrowing from the underlying buffer.
    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure_remaining(len)?;
        let slice = &self.buffer[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Reads `len` bytes into a freshly allocated vector.
    ///
    /// Used for variable fields whose size was announced by an earlier
    /// length field.
    pub fn read_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        self.read_slice(len).map(<[u8]>::to_vec)
    }

    pub fn read_fixed<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_slice(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        let [byte] = self.read_fixed::<1>()?;
        Ok(byte)
    }

    pub fn read_u16_le(&mut self) -> Result<u16> {
        self.read_fixed::<2>().map(u16::from_le_bytes)
    }

    pub fn read_u32_le(&mut self) -> Result<u32> {
        self.read_fixed::<4>().map(u32::from_le_bytes)
    }

    pub fn read_u32_be(&mut self) -> Result<u32> {
        self.read_fixed::<4>().map(u32::from_be_bytes)
    }

    /// Reads the final field of a message.
    ///
    /// The remaining length must be exactly `len`, so a message that is
    /// longer or shorter than its layout is rejected here.
    pub fn read_exact_remaining(&mut self, len: usize) -> Result<Vec<u8>> {
        if self.remaining() != len {
            return Err(CodecError::RemainingLengthMismatch {
                remaining: self.remaining(),
                expected: len,
            });
        }
        self.read_bytes(len)
    }

    /// Consumes everything left in the buffer.
    pub fn read_rest(&mut self) -> Vec<u8> {
        let rest = self.buffer[self.position..].to_vec();
        self.position = self.buffer.len();
        rest
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure_remaining(len)?;
        self.position += len;
        Ok(())
    }

    pub fn seek(&mut self, position: usize) -> Result<()> {
        if position > self.buffer.len() {
            return Err(CodecError::InvalidPosition {
                size: self.buffer.len(),
                position,
            });
        }
        self.position = position;
        Ok(())
    }

    /// Looks for a 32-bit big-endian sentinel at unknown alignment.
    ///
    /// Word-aligned offsets (relative to the current position) are scanned
    /// first, then the scan is repeated shifted by one, two and three bytes.
    /// Returns the distance from the current position; the position itself
    /// is left untouched.
    pub fn find_first(&self, value: u32) -> Result<usize> {
        let needle = value.to_be_bytes();
        let haystack = &self.buffer[self.position..];
        for shift in 0..needle.len() {
            let mut offset = shift;
            while offset + needle.len() <= haystack.len() {
                if haystack[offset..offset + needle.len()] == needle {
                    return Ok(offset);
                }
                offset += needle.len();
            }
        }
        Err(CodecError::ValueNotFound { value })
    }

    fn ensure_remaining(&self, requested: usize) -> Result<()> {
        if self.remaining() < requested {
            return Err(CodecError::BufferUnderflow {
                remaining: self.remaining(),
                requested,
            });
        }
        Ok(())
    }
}
