//! Bit-level reader with bounded operations.

use crate::error::{BitError, BitResult};

/// Widest field a single read can return.
pub const MAX_READ_BITS: u8 = 32;

/// A bit-level reader over one received server message.
///
/// The cursor only moves forward. Every read is bounds-checked against the
/// declared message size and fails atomically: a failed read leaves the
/// cursor where it was.
#[derive(Debug)]
pub struct BitReader<'a> {
    data: &'a [u8],
    bit_pos: usize,
}

impl<'a> BitReader<'a> {
    /// Creates a new `BitReader` from a byte slice.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, bit_pos: 0 }
    }

    /// Returns the declared message size in bits.
    #[must_use]
    pub const fn bit_len(&self) -> usize {
        self.data.len().saturating_mul(8)
    }

    /// Returns the number of bits remaining to read.
    #[must_use]
    pub const fn bits_remaining(&self) -> usize {
        self.bit_len().saturating_sub(self.bit_pos)
    }

    /// Returns `true` if there are no more bits to read.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bits_remaining() == 0
    }

    /// Returns the current bit position.
    #[must_use]
    pub const fn bit_position(&self) -> usize {
        self.bit_pos
    }

    /// Returns the number of bytes touched so far (partial bytes count).
    #[must_use]
    pub const fn bytes_consumed(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }

    /// Reads a single bit as a boolean.
    pub fn read_bit(&mut self) -> BitResult<bool> {
        self.ensure_bits(1)?;
        let byte_idx = self.bit_pos / 8;
        let bit_idx = self.bit_pos % 8;
        let bit = (self.data[byte_idx] >> (7 - bit_idx)) & 1;
        self.bit_pos += 1;
        Ok(bit == 1)
    }

    /// Reads up to 32 bits as an unsigned integer (MSB first).
    pub fn read_bits(&mut self, bits: u8) -> BitResult<u32> {
        if bits > MAX_READ_BITS {
            return Err(BitError::InvalidBitCount {
                bits,
                max_bits: MAX_READ_BITS,
            });
        }
        if bits == 0 {
            return Ok(0);
        }
        self.ensure_bits(bits as usize)?;

        let mut value = 0u32;
        for _ in 0..bits {
            value = (value << 1) | u32::from(self.read_bit()?);
        }
        Ok(value)
    }

    /// Reads a two's complement integer of `bits` width, sign-extended to `i32`.
    pub fn read_signed_bits(&mut self, bits: u8) -> BitResult<i32> {
        let raw = self.read_bits(bits)?;
        Ok(sign_extend(raw, bits))
    }

    /// Reads an unsigned byte.
    pub fn read_u8(&mut self) -> BitResult<u8> {
        let value = self.read_bits(8)?;
        Ok(value as u8)
    }

    /// Reads a signed 16-bit short.
    pub fn read_i16(&mut self) -> BitResult<i16> {
        let value = self.read_bits(16)?;
        Ok(value as u16 as i16)
    }

    /// Reads a signed 32-bit long.
    pub fn read_i32(&mut self) -> BitResult<i32> {
        let value = self.read_bits(32)?;
        Ok(value as i32)
    }

    /// Reads a raw IEEE-754 single.
    pub fn read_f32(&mut self) -> BitResult<f32> {
        let value = self.read_bits(32)?;
        Ok(f32::from_bits(value))
    }

    /// Reads a zero-terminated string.
    ///
    /// The terminator is always consumed. At most `max_len - 1` characters are
    /// kept; the rest are dropped. Bytes above 127 are replaced with `.`.
    pub fn read_string(&mut self, max_len: usize) -> BitResult<String> {
        let start = self.bit_pos;
        let keep = max_len.saturating_sub(1);
        let mut out = String::new();
        loop {
            let byte = match self.read_u8() {
                Ok(byte) => byte,
                Err(err) => {
                    self.bit_pos = start;
                    return Err(err);
                }
            };
            if byte == 0 {
                break;
            }
            if out.len() < keep {
                out.push(if byte > 127 { '.' } else { char::from(byte) });
            }
        }
        Ok(out)
    }

    /// Fills `out` with the next `out.len()` bytes.
    pub fn read_data(&mut self, out: &mut [u8]) -> BitResult<()> {
        self.ensure_bits(out.len().saturating_mul(8))?;
        for slot in out.iter_mut() {
            *slot = self.read_u8()?;
        }
        Ok(())
    }

    /// Reads `len` bytes into a new buffer.
    pub fn read_bytes(&mut self, len: usize) -> BitResult<Vec<u8>> {
        let mut out = vec![0u8; len];
        self.read_data(&mut out)?;
        Ok(out)
    }

    /// Advances past `len` bytes without copying them.
    pub fn skip_bytes(&mut self, len: usize) -> BitResult<()> {
        let bits = len.saturating_mul(8);
        self.ensure_bits(bits)?;
        self.bit_pos += bits;
        Ok(())
    }

    fn ensure_bits(&self, bits: usize) -> BitResult<()> {
        let available = self.bits_remaining();
        if bits > available {
            return Err(BitError::UnexpectedEof {
                requested: bits,
                available,
            });
        }
        Ok(())
    }
}

pub(crate) const fn sign_extend(raw: u32, bits: u8) -> i32 {
    if bits == 0 {
        return 0;
    }
    if bits >= 32 {
        return raw as i32;
    }
    let shift = 32 - bits as u32;
    ((raw << shift) as i32) >> shift
}
