use byteorder::{ByteOrder, LittleEndian};

use crate::error::MasterQueryError;

/// Read-only cursor over a received datagram.
///
/// `length` is the number of bytes actually received, which may be smaller than
/// the buffer's capacity. Reads only ever move the position forward, and a read
/// that fails leaves the position where it was.
#[derive(Debug, Clone)]
pub struct ResponseCursor<'a> {
    buffer: &'a [u8],
    position: usize,
    length: usize,
}

impl<'a> ResponseCursor<'a> {
    /// Wrap the first `length` bytes of `buffer`. A `length` past the end of
    /// `buffer` is clamped to it.
    pub fn new(buffer: &'a [u8], length: usize) -> Self {
        ResponseCursor {
            buffer,
            position: 0,
            length: length.min(buffer.len()),
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Bytes left between the position and the valid length.
    pub fn remaining(&self) -> usize {
        self.length - self.position
    }

    /// The unread bytes, without consuming them.
    pub fn rest(&self) -> &'a [u8] {
        &self.buffer[self.position..self.length]
    }

    /// Borrow the next `n` bytes and advance past them.
    fn take(&mut self, n: usize) -> Result<&'a [u8], MasterQueryError> {
        let end = self.position + n;
        if end > self.length {
            return Err(MasterQueryError::TruncatedBuffer {
                needed: end,
                position: self.position,
                length: self.length,
            });
        }
        let bytes = &self.buffer[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    /// Get the next [u8].
    pub fn read_u8(&mut self) -> Result<u8, MasterQueryError> {
        Ok(self.take(1)?[0])
    }

    /// Get the next 2 bytes as a little-endian [u16].
    pub fn read_u16(&mut self) -> Result<u16, MasterQueryError> {
        Ok(LittleEndian::read_u16(self.take(2)?))
    }

    /// Get the next terminated string.
    ///
    /// The string ends at the first `0x00` or `0xFF` byte, which is consumed but
    /// not returned. Every `%` comes back as `.`. Other bytes map to the Unicode
    /// code point of the same value. If the buffer runs out before a terminator,
    /// the error is returned and the position is restored.
    pub fn read_string(&mut self) -> Result<String, MasterQueryError> {
        let start = self.position;
        let mut result = String::new();
        loop {
            let c = match self.read_u8() {
                Ok(c) => c,
                Err(e) => {
                    self.position = start;
                    return Err(e);
                }
            };
            match c {
                0 | 255 => break,
                b'%' => result.push('.'),
                c => result.push(char::from(c)),
            }
        }
        Ok(result)
    }
}
