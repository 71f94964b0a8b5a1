//! Byte buffer utilities for parsing the `.osr` binary layout.
//!
//! `ByteReader` is a position-tracking reader over a byte slice. All integer
//! reads are little-endian. On top of the primitives it implements the two
//! osu!-specific encodings: ULEB128 lengths and prefixed UTF-8 strings.

use crate::error::{Error, Result};

/// A position-tracking byte reader for the `.osr` wire format.
///
/// # Example
///
/// ```
/// use osu_analysis_core::replay::ByteReader;
///
/// let data = [0x78, 0x56, 0x34, 0x12];
/// let mut buf = ByteReader::new(&data);
///
/// assert_eq!(buf.read_i32().unwrap(), 0x12345678);
/// assert_eq!(buf.position(), 4);
/// ```
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    /// Returns the current read position.
    pub fn position(&self) -> usize {
        self.pos
    }

    /// Returns the number of bytes remaining from the current position.
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Skips the specified number of bytes.
    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.read_bytes(count).map(|_| ())
    }

    /// Reads the specified number of bytes and advances the position.
    pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(count)
            .ok_or_else(|| Error::BufferReadFailed {
                position: self.pos,
                message: "Position overflow".to_string(),
            })?;

        if end > self.data.len() {
            return Err(Error::BufferReadFailed {
                position: self.pos,
                message: format!(
                    "Read of {} bytes at position {} exceeds buffer length {}",
                    count,
                    self.pos,
                    self.data.len()
                ),
            });
        }

        let result = &self.data[self.pos..end];
        self.pos = end;
        Ok(result)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16> {
        let bytes = self.read_bytes(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        let bytes = self.read_bytes(4)?;
        Ok(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u32(&mut self) -> Result<u32> {
        let bytes = self.read_bytes(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        let bytes = self.read_bytes(8)?;
        Ok(i64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    pub fn read_u64(&mut self) -> Result<u64> {
        let bytes = self.read_bytes(8)?;
        Ok(u64::from_le_bytes([
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ]))
    }

    /// Reads an unsigned LEB128-encoded integer.
    pub fn read_uleb128(&mut self) -> Result<u64> {
        let mut result: u64 = 0;
        let mut shift = 0u32;

        loop {
            let byte = self.read_u8()?;
            result |= u64::from(byte & 0x7f) << shift;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
            shift += 7;
            if shift >= 64 {
                return Err(Error::BufferReadFailed {
                    position: self.pos,
                    message: "ULEB128 value exceeds 64 bits".to_string(),
                });
            }
        }
    }

    /// Reads an osu! string: `0x00` for empty, or `0x0b` followed by a
    /// ULEB128 byte length and UTF-8 data.
    pub fn read_osu_string(&mut self) -> Result<String> {
        match self.read_u8()? {
            0x00 => Ok(String::new()),
            0x0b => {
                let len = self.read_uleb128()? as usize;
                let bytes = self.read_bytes(len)?;
                String::from_utf8(bytes.to_vec()).map_err(|e| Error::BufferReadFailed {
                    position: self.pos,
                    message: format!("Invalid UTF-8 in string: {}", e),
                })
            }
            flag => Err(Error::BufferReadFailed {
                position: self.pos,
                message: format!("Invalid string flag byte {:#04x}", flag),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_i32() {
        let data = [0x78, 0x56, 0x34, 0x12];
        let mut buf = ByteReader::new(&data);

        assert_eq!(buf.read_i32().unwrap(), 0x12345678);
        assert_eq!(buf.position(), 4);
    }

    #[test]
    fn test_read_u64() {
        let data = [0xEF, 0xCD, 0xAB, 0x90, 0x78, 0x56, 0x34, 0x12];
        let mut buf = ByteReader::new(&data);

        assert_eq!(buf.read_u64().unwrap(), 0x1234567890ABCDEF);
    }

    #[test]
    fn test_sequential_reads() {
        let data = [
            0x01, 0x00, // u16: 1
            0x02, 0x00, 0x00, 0x00, // i32: 2
            0x03, // u8: 3
        ];
        let mut buf = ByteReader::new(&data);

        assert_eq!(buf.read_u16().unwrap(), 1);
        assert_eq!(buf.read_i32().unwrap(), 2);
        assert_eq!(buf.read_u8().unwrap(), 3);
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_overflow_error() {
        let data = [0x01, 0x02];
        let mut buf = ByteReader::new(&data);
        assert!(buf.read_i32().is_err());
    }

    #[test]
    fn test_uleb128_single_byte() {
        let data = [0x45];
        let mut buf = ByteReader::new(&data);
        assert_eq!(buf.read_uleb128().unwrap(), 0x45);
    }

    #[test]
    fn test_uleb128_multi_byte() {
        // 300 = 0b10_0101100 -> 0xAC 0x02
        let data = [0xAC, 0x02];
        let mut buf = ByteReader::new(&data);
        assert_eq!(buf.read_uleb128().unwrap(), 300);
    }

    #[test]
    fn test_osu_string_empty() {
        let data = [0x00];
        let mut buf = ByteReader::new(&data);
        assert_eq!(buf.read_osu_string().unwrap(), "");
    }

    #[test]
    fn test_osu_string_ascii() {
        let data = [0x0b, 0x03, b'a', b'b', b'c'];
        let mut buf = ByteReader::new(&data);
        assert_eq!(buf.read_osu_string().unwrap(), "abc");
        assert_eq!(buf.remaining(), 0);
    }

    #[test]
    fn test_osu_string_bad_flag() {
        let data = [0x05, 0x03, b'a'];
        let mut buf = ByteReader::new(&data);
        assert!(buf.read_osu_string().is_err());
    }

    #[test]
    fn test_skip() {
        let data = [0x01, 0x02, 0x03, 0x04];
        let mut buf = ByteReader::new(&data);
        buf.skip(2).unwrap();
        assert_eq!(buf.read_u16().unwrap(), 0x0403);
    }
}
