use crate::error::SerdeErr;

/// A bounds-checked big-endian reader over received packet bytes.
///
/// Every read is fallible: packets come off the wire and any malformed or
/// truncated payload must surface as an error instead of a panic.
pub struct ByteReader<'b> {
    buffer: &'b [u8],
    offset: usize,
}

impl<'b> ByteReader<'b> {
    pub fn new(buffer: &'b [u8]) -> Self {
        Self { buffer, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len() - self.offset
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    fn take(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        if self.remaining() < count {
            return Err(SerdeErr::UnexpectedEnd {
                offset: self.offset,
                needed: count - self.remaining(),
            });
        }
        let slice = &self.buffer[self.offset..self.offset + count];
        self.offset += count;
        Ok(slice)
    }

    pub fn read_u8(&mut self) -> Result<u8, SerdeErr> {
        Ok(self.take(1)?[0])
    }

    pub fn read_u16(&mut self) -> Result<u16, SerdeErr> {
        let bytes = self.take(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_u32(&mut self) -> Result<u32, SerdeErr> {
        let bytes = self.take(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_u64(&mut self) -> Result<u64, SerdeErr> {
        let bytes = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(bytes);
        Ok(u64::from_be_bytes(out))
    }

    pub fn read_i16(&mut self) -> Result<i16, SerdeErr> {
        let bytes = self.take(2)?;
        Ok(i16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub fn read_i64(&mut self) -> Result<i64, SerdeErr> {
        let bytes = self.take(8)?;
        let mut out = [0u8; 8];
        out.copy_from_slice(bytes);
        Ok(i64::from_be_bytes(out))
    }

    pub fn read_f32(&mut self) -> Result<f32, SerdeErr> {
        let bytes = self.take(4)?;
        Ok(f32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub fn read_bool(&mut self) -> Result<bool, SerdeErr> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_bytes(&mut self, count: usize) -> Result<&'b [u8], SerdeErr> {
        self.take(count)
    }

    /// Reads a u16 length prefix followed by that many raw bytes.
    pub fn read_prefixed_bytes(&mut self) -> Result<&'b [u8], SerdeErr> {
        let length = self.read_u16()? as usize;
        if length > self.remaining() {
            return Err(SerdeErr::BadLength {
                length,
                remaining: self.remaining(),
            });
        }
        self.take(length)
    }

    /// Reads a u16 length prefix followed by UTF-8 bytes.
    pub fn read_string(&mut self) -> Result<String, SerdeErr> {
        let bytes = self.read_prefixed_bytes()?;
        String::from_utf8(bytes.to_vec()).map_err(|_| SerdeErr::InvalidUtf8)
    }
}
