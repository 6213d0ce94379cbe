// Bounds-checked byte cursor and writer used by every container parser

use crate::error::{Result, TagError};

/// Read-only cursor over an in-memory buffer
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        ByteCursor { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Move to an absolute position (the end of the buffer is allowed)
    pub fn seek(&mut self, pos: usize) -> Result<()> {
        if pos > self.data.len() {
            return Err(TagError::TruncatedData {
                offset: pos,
                needed: 0,
                available: self.data.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Borrow the next `count` bytes and advance past them
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let bytes = self.peek_bytes(count).ok_or(TagError::TruncatedData {
            offset: self.pos,
            needed: count,
            available: self.remaining(),
        })?;
        self.pos += count;
        Ok(bytes)
    }

    /// Borrow the next `count` bytes without advancing
    pub fn peek_bytes(&self, count: usize) -> Option<&'a [u8]> {
        let end = self.pos.checked_add(count)?;
        self.data.get(self.pos..end)
    }

    /// Borrow everything from the current position to the end
    pub fn rest(&mut self) -> &'a [u8] {
        let data = self.data;
        let bytes = &data[self.pos..];
        self.pos = self.data.len();
        bytes
    }

    fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut buffer = [0u8; N];
        buffer.copy_from_slice(self.read_bytes(N)?);
        Ok(buffer)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_be_u16(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    /// Read big-endian 24-bit integer
    pub fn read_be_u24(&mut self) -> Result<u32> {
        let b = self.read_bytes(3)?;
        Ok(((b[0] as u32) << 16) | ((b[1] as u32) << 8) | (b[2] as u32))
    }

    pub fn read_be_u32(&mut self) -> Result<u32> {
        Ok(u32::from_be_bytes(self.read_array()?))
    }

    pub fn read_be_u64(&mut self) -> Result<u64> {
        Ok(u64::from_be_bytes(self.read_array()?))
    }

    pub fn read_le_u32(&mut self) -> Result<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    /// Read synchsafe 32-bit integer (7 bits per byte, high bit masked)
    pub fn read_synchsafe_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(synchsafe_u32(b))
    }

    pub fn read_fourcc(&mut self) -> Result<[u8; 4]> {
        self.read_array()
    }

    /// Read a little-endian u32 length followed by that many bytes
    pub fn read_le_prefixed(&mut self) -> Result<&'a [u8]> {
        let length = self.read_le_u32()? as usize;
        self.read_bytes(length)
    }

    /// Read a big-endian u32 length followed by that many bytes
    pub fn read_be_prefixed(&mut self) -> Result<&'a [u8]> {
        let length = self.read_be_u32()? as usize;
        self.read_bytes(length)
    }
}

/// Decode a 4-byte synchsafe integer
pub fn synchsafe_u32(bytes: &[u8]) -> u32 {
    bytes
        .iter()
        .take(4)
        .fold(0u32, |acc, &b| (acc << 7) | (b & 0x7F) as u32)
}

/// Append-only big/little-endian writer
#[derive(Debug, Default)]
pub struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    pub fn new() -> Self {
        ByteWriter::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        ByteWriter {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn put_be_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Write big-endian 24-bit integer; values over 24 bits are rejected
    pub fn put_be_u24(&mut self, value: u32) -> Result<()> {
        if value > 0x00FF_FFFF {
            return Err(TagError::malformed(format!(
                "value {} does not fit in 24 bits",
                value
            )));
        }
        self.buf.extend_from_slice(&value.to_be_bytes()[1..]);
        Ok(())
    }

    pub fn put_be_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_be_u64(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn put_le_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// Little-endian u32 length followed by the UTF-8 bytes
    pub fn put_lp_string(&mut self, text: &str) {
        self.put_le_u32(text.len() as u32);
        self.put_bytes(text.as_bytes());
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mixed_endianness() {
        let data = [0x00, 0x01, 0x02, 0x03, 0x04, 0x00, 0x00, 0x00, 0xAB];
        let mut cursor = ByteCursor::new(&data);
        assert_eq!(cursor.read_be_u24().unwrap(), 0x000102);
        assert_eq!(cursor.read_u8().unwrap(), 0x03);
        assert_eq!(cursor.read_le_u32().unwrap(), 4);
        assert_eq!(cursor.remaining(), 1);
        assert_eq!(cursor.read_u8().unwrap(), 0xAB);
        assert!(cursor.is_empty());
    }

    #[test]
    fn out_of_bounds_read_is_truncated_error() {
        let data = [1, 2, 3];
        let mut cursor = ByteCursor::new(&data);
        cursor.skip(2).unwrap();
        match cursor.read_be_u32() {
            Err(TagError::TruncatedData {
                offset,
                needed,
                available,
            }) => {
                assert_eq!((offset, needed, available), (2, 4, 1));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        // a failed read leaves the position alone
        assert_eq!(cursor.position(), 2);
    }

    #[test]
    fn huge_length_prefix_does_not_overflow() {
        let data = [0xFF, 0xFF, 0xFF, 0xFF, 0x00];
        let mut cursor = ByteCursor::new(&data);
        assert!(cursor.read_le_prefixed().is_err());
    }

    #[test]
    fn synchsafe_masks_high_bits() {
        assert_eq!(synchsafe_u32(&[0x00, 0x00, 0x02, 0x01]), 257);
        assert_eq!(synchsafe_u32(&[0x7F, 0x7F, 0x7F, 0x7F]), 0x0FFF_FFFF);
        assert_eq!(synchsafe_u32(&[0x80, 0x80, 0x80, 0x81]), 1);
    }

    #[test]
    fn writer_rejects_oversized_u24() {
        let mut writer = ByteWriter::new();
        writer.put_be_u24(0x00AB_CDEF).unwrap();
        assert!(writer.put_be_u24(0x0100_0000).is_err());
        assert_eq!(writer.into_inner(), vec![0xAB, 0xCD, 0xEF]);
    }

    #[test]
    fn writer_length_prefixed_string() {
        let mut writer = ByteWriter::new();
        writer.put_lp_string("ab");
        assert_eq!(writer.into_inner(), vec![2, 0, 0, 0, b'a', b'b']);
    }
}
