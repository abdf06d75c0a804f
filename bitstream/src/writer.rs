//! Bit-level writer for encoding server messages.

use crate::error::{BitError, BitResult};
use crate::reader::MAX_READ_BITS;

/// A bit-level writer producing the same MSB-first layout [`BitReader`] consumes.
///
/// Writes are accumulated in an internal buffer. Call [`finish`](Self::finish)
/// to get the final byte buffer.
///
/// [`BitReader`]: crate::BitReader
#[derive(Debug, Default)]
pub struct BitWriter {
    /// The accumulated bytes.
    bytes: Vec<u8>,
    /// Current byte being written (not yet pushed to bytes).
    current_byte: u8,
    /// Number of bits written to `current_byte` (0-7).
    bit_count: u8,
}

impl BitWriter {
    /// Creates a new empty `BitWriter`.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new `BitWriter` with pre-allocated capacity.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bytes: Vec::with_capacity(bytes),
            current_byte: 0,
            bit_count: 0,
        }
    }

    /// Returns the number of bits written so far.
    #[must_use]
    pub fn bits_written(&self) -> usize {
        self.bytes.len() * 8 + self.bit_count as usize
    }

    /// Writes a single bit.
    pub fn write_bit(&mut self, value: bool) {
        self.current_byte = (self.current_byte << 1) | u8::from(value);
        self.bit_count += 1;
        if self.bit_count == 8 {
            self.bytes.push(self.current_byte);
            self.current_byte = 0;
            self.bit_count = 0;
        }
    }

    /// Writes up to 32 bits from an unsigned integer.
    ///
    /// # Errors
    ///
    /// Returns [`BitError::InvalidBitCount`] if `bits > 32`.
    /// Returns [`BitError::ValueOutOfRange`] if `value` doesn't fit in `bits`.
    pub fn write_bits(&mut self, value: u32, bits: u8) -> BitResult<()> {
        if bits > MAX_READ_BITS {
            return Err(BitError::InvalidBitCount {
                bits,
                max_bits: MAX_READ_BITS,
            });
        }
        if bits == 0 {
            return Ok(());
        }
        if bits < 32 && value >= (1u32 << bits) {
            return Err(BitError::ValueOutOfRange {
                value: i64::from(value),
                bits,
            });
        }

        for i in (0..bits).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
        Ok(())
    }

    /// Writes a two's complement integer in `bits` width.
    pub fn write_signed_bits(&mut self, value: i32, bits: u8) -> BitResult<()> {
        if bits == 0 || bits > MAX_READ_BITS {
            return Err(BitError::InvalidBitCount {
                bits,
                max_bits: MAX_READ_BITS,
            });
        }
        if bits < 32 {
            let min = -(1i64 << (bits - 1));
            let max = (1i64 << (bits - 1)) - 1;
            let wide = i64::from(value);
            if wide < min || wide > max {
                return Err(BitError::ValueOutOfRange { value: wide, bits });
            }
            let mask = (1u32 << bits) - 1;
            return self.write_bits(value as u32 & mask, bits);
        }
        self.write_bits(value as u32, 32)
    }

    /// Writes an unsigned byte.
    pub fn write_u8(&mut self, value: u8) {
        for i in (0..8).rev() {
            self.write_bit((value >> i) & 1 == 1);
        }
    }

    /// Writes a signed 16-bit short.
    pub fn write_i16(&mut self, value: i16) {
        let [hi, lo] = value.to_be_bytes();
        self.write_u8(hi);
        self.write_u8(lo);
    }

    /// Writes a signed 32-bit long.
    pub fn write_i32(&mut self, value: i32) {
        for byte in value.to_be_bytes() {
            self.write_u8(byte);
        }
    }

    /// Writes a raw IEEE-754 single.
    pub fn write_f32(&mut self, value: f32) {
        for byte in value.to_bits().to_be_bytes() {
            self.write_u8(byte);
        }
    }

    /// Writes a string followed by its zero terminator.
    ///
    /// Interior zero bytes would end the string early on the reading side, so
    /// the string is cut at the first one.
    pub fn write_string(&mut self, value: &str) {
        for byte in value.bytes().take_while(|b| *b != 0) {
            self.write_u8(byte);
        }
        self.write_u8(0);
    }

    /// Writes raw bytes.
    pub fn write_data(&mut self, data: &[u8]) {
        for byte in data {
            self.write_u8(*byte);
        }
    }

    /// Finishes writing and returns the byte buffer.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    #[must_use]
    pub fn finish(mut self) -> Vec<u8> {
        if self.bit_count > 0 {
            self.current_byte <<= 8 - self.bit_count;
            self.bytes.push(self.current_byte);
        }
        self.bytes
    }

    /// Finishes writing and appends to the provided buffer.
    ///
    /// If the last byte is incomplete, it is padded with zeros on the right.
    pub fn finish_into(mut self, buf: &mut Vec<u8>) {
        if self.bit_count > 0 {
            self.current_byte <<= 8 - self.bit_count;
            self.bytes.push(self.current_byte);
        }
        buf.append(&mut self.bytes);
    }
}
