//! Backwards bit reading for the CRILAYLA payload.
//!
//! The payload is consumed from its last byte toward its first, and each byte
//! from its most significant bit down. That is just a big endian bitstream over
//! the payload's bytes in reverse, so a [`ReverseBytes`] adapter feeds a regular
//! big endian `BitReader`.

use crate::errors::CrilaylaError;
use bitstream_io::{BigEndian, BitReader};
use std::io::{self, Read};

/// A `Read`er that yields the bytes of a slice from the end toward the start
#[derive(Debug, Clone)]
pub struct ReverseBytes<'a> {
    data: &'a [u8],
    // one past the next byte to be read
    end: usize,
}

impl<'a> ReverseBytes<'a> {
    #[inline]
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            end: data.len(),
        }
    }
}

impl Read for ReverseBytes<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = buf.len().min(self.end);
        let remaining = &self.data[self.end - n..self.end];
        for (slot, byte) in buf.iter_mut().zip(remaining.iter().rev()) {
            *slot = *byte;
        }
        self.end -= n;

        Ok(n)
    }
}

/// The bit cursor for one segment's payload.
///
/// Every read is checked against the number of bits left in the payload, so a
/// corrupt stream fails with [`CrilaylaError::OutOfBits`] instead of reading
/// past the start of the payload.
pub struct ReverseBitReader<'a> {
    bits: BitReader<ReverseBytes<'a>, BigEndian>,
    remaining: u64,
}

impl<'a> ReverseBitReader<'a> {
    /// Start reading at the last byte of `payload`
    pub fn new(payload: &'a [u8]) -> Self {
        Self {
            bits: BitReader::endian(ReverseBytes::new(payload), BigEndian),
            remaining: payload.len() as u64 * 8,
        }
    }

    /// Read the next `n` bits, `1 <= n <= 16`. The first bit read ends up as
    /// the most significant bit of the result.
    pub fn read_bits(&mut self, n: u32) -> Result<u16, CrilaylaError> {
        assert!(n >= 1 && n <= 16, "can only read 1 to 16 bits at a time");
        if u64::from(n) > self.remaining {
            return Err(CrilaylaError::OutOfBits {
                requested: n,
                remaining: self.remaining,
            });
        }

        let value = self.bits.read::<u16>(n)?;
        self.remaining -= u64::from(n);

        Ok(value)
    }

    #[inline]
    pub fn read_bit(&mut self) -> Result<bool, CrilaylaError> {
        self.read_bits(1).map(|b| b == 1)
    }

    /// Number of unread bits left in the payload
    #[inline]
    pub fn bits_remaining(&self) -> u64 {
        self.remaining
    }
}
