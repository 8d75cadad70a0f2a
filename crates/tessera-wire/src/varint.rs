//! Varints, zig-zag, and a bounds-checked payload reader.

use crate::error::{DecodeError, ParseErrorKind};

/// Longest legal varint encoding of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Append `value` as a base-128 varint.
pub fn put_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7f) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}

/// Bytes [`put_varint`] writes for `value`.
pub fn varint_len(value: u64) -> usize {
    let bits = 64 - (value | 1).leading_zeros() as usize;
    bits.div_ceil(7)
}

/// Zig-zag map a signed 32-bit value so small magnitudes stay short.
pub fn zigzag_encode32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

/// Inverse of [`zigzag_encode32`].
pub fn zigzag_decode32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ -((n & 1) as i32)
}

/// Zig-zag map a signed 64-bit value.
pub fn zigzag_encode64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

/// Inverse of [`zigzag_encode64`].
pub fn zigzag_decode64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ -((n & 1) as i64)
}

/// Cursor over `buf[pos..end]`. Offsets in errors are absolute into `buf`.
pub(crate) struct Reader<'b> {
    buf: &'b [u8],
    pos: usize,
    end: usize,
}

impl<'b> Reader<'b> {
    pub(crate) fn new(buf: &'b [u8], start: usize, end: usize) -> Self {
        Self {
            buf,
            pos: start,
            end: end.min(buf.len()),
        }
    }

    pub(crate) fn pos(&self) -> usize {
        self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.pos >= self.end
    }

    fn truncated(&self) -> DecodeError {
        DecodeError::parse(self.pos, ParseErrorKind::Truncated)
    }

    pub(crate) fn read_varint(&mut self) -> Result<u64, DecodeError> {
        let start = self.pos;
        let mut value = 0u64;
        for i in 0..MAX_VARINT_LEN {
            if self.pos >= self.end {
                return Err(self.truncated());
            }
            let byte = self.buf[self.pos];
            self.pos += 1;
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(DecodeError::parse(start, ParseErrorKind::MalformedVarint));
            }
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                return Ok(value);
            }
        }
        Err(DecodeError::parse(start, ParseErrorKind::MalformedVarint))
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        if self.end - self.pos < N {
            return Err(self.truncated());
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.buf[self.pos..self.pos + N]);
        self.pos += N;
        Ok(out)
    }

    pub(crate) fn read_fixed32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.take()?))
    }

    pub(crate) fn read_fixed64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.take()?))
    }

    /// Read a length prefix and step over the payload; returns its range.
    pub(crate) fn read_delimited(&mut self) -> Result<(usize, usize), DecodeError> {
        let len = self.read_varint()?;
        let remaining = (self.end - self.pos) as u64;
        if len > remaining {
            return Err(self.truncated());
        }
        let start = self.pos;
        self.pos += len as usize;
        Ok((start, self.pos))
    }

    pub(crate) fn skip(&mut self, n: usize) -> Result<(), DecodeError> {
        if self.end - self.pos < n {
            return Err(self.truncated());
        }
        self.pos += n;
        Ok(())
    }

    pub(crate) fn slice(&self, start: usize, end: usize) -> &'b [u8] {
        &self.buf[start..end]
    }
}
