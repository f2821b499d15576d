//! Information and structures for CRILAYLA compressed segments.
//!
//! A CRILAYLA segment is stored inside a CPK archive wherever a file entry's
//! `ExtractSize` is larger than its `FileSize`. A segment has three parts:
//! 1. Prologue
//! 2. Compressed payload
//! 3. Uncompressed header block
//!
//! ## Prologue
//! The sixteen byte prologue identifies the segment and stores the sizes needed
//! to decode it. It can be extracted into a [`SegmentHeader`] by using [`segment_info()`].
//!
//! | Byte Num | Description |
//! | :------: | ----------- |
//! | 0..8     | magic bytes ("CRILAYLA"), or eight zero bytes |
//! | 8..12    | size in little endian bytes of the decoded payload |
//! | 12..16   | little endian offset of the header block, relative to byte 16 |
//!
//! ## Compressed Payload
//! The payload sits between the prologue and the header block. It is read
//! *backwards*: the first byte consumed is the last byte of the payload, and bits are
//! taken from each byte most significant first. The decoded bytes are also produced
//! backwards, starting from the end of the output.
//!
//! Each token begins with a flag bit. A `0` is followed by an eight bit literal.
//! A `1` is a back-reference: thirteen bits of distance, then a length encoded as a
//! cascade of groups.
//!
//! | Group  | Bits | Continue if |
//! | :----: | :--: | ----------- |
//! | 1      | 2    | value == 3   |
//! | 2      | 3    | value == 7   |
//! | 3      | 5    | value == 31  |
//! | 4      | 8    | value == 255 |
//! | 5..    | 8    | value == 255 |
//!
//! The length is three plus the sum of every group read. The copy starts
//! `distance + 3` bytes *after* the byte being written, and walks down together
//! with the output.
//!
//! ## Header Block
//! The last `0x100` bytes of the segment are stored uncompressed, and become the
//! first `0x100` bytes of the decompressed file.
//!
//! ## An Example
//! Let's encode the six byte payload "AAAAAA", with a header block of zeros.
//! Output is produced from the end, so the first three tokens are literals for
//! `output[0x105]`, `output[0x104]`, and `output[0x103]`. The rest is a back-reference
//! with a distance of zero, which copies from three bytes past the write position.
//! ```text
//! 0 01000001 <- 'A' (output[0x105])
//! 0 01000001 <- 'A' (output[0x104])
//! 0 01000001 <- 'A' (output[0x103])
//! ┌ back-reference
//! | ┌ distance (0)
//! | |             ┌ first length group (0), so length is 3
//! 1 0000000000000 00
//! 00000         <- padding
//! ```
//! These 48 bits are packed into six bytes, which are then stored in reverse order.
//!
//! [`segment_info()`]: crate::segment_info

use crate::errors::CrilaylaError;
use std::fmt;
use std::io::Read;

/// `"CRILAYLA"` as a big endian integer
pub const CRILAYLA_MAGIC: u64 = 0x4352_494C_4159_4C41;
/// Size of the segment prologue (signature and two sizes)
pub const PROLOGUE_SIZE: usize = 0x10;
/// Size of the uncompressed header block at the end of a segment
pub const HEADER_BLOCK_SIZE: usize = 0x100;
/// Bits in a back-reference distance
pub(crate) const DISTANCE_BITS: u32 = 13;
/// Shortest possible back-reference
pub(crate) const MIN_MATCH: usize = 3;
/// Bit widths of the length cascade, before the repeating eight bit tail
pub(crate) const LENGTH_WIDTHS: [u32; 4] = [2, 3, 5, 8];

/// The two signatures that mark a segment as compressed
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Signature {
    /// ASCII "CRILAYLA"
    Crilayla,
    /// Two zero 32-bit words
    Zero,
}

impl Signature {
    /// Identify the first eight bytes of a segment
    pub fn from_bytes(sig: &[u8; 8]) -> Result<Self, CrilaylaError> {
        if u64::from_be_bytes(*sig) == CRILAYLA_MAGIC {
            Ok(Self::Crilayla)
        } else if sig[0..4] == [0; 4] && sig[4..8] == [0; 4] {
            Ok(Self::Zero)
        } else {
            Err(CrilaylaError::BadSignature(*sig))
        }
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Crilayla => write!(f, "CRILAYLA"),
            Self::Zero => write!(f, "Zero"),
        }
    }
}

/// The information stored in the prologue of a CRILAYLA segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentHeader {
    pub signature: Signature,
    /// size of decoded payload, not counting the header block
    pub uncompressed_size: u32,
    /// offset of the header block, relative to the end of the prologue
    pub header_offset: u32,
}

impl SegmentHeader {
    /// Read the prologue from the current position of `rdr`.
    ///
    /// The signature is checked before anything past the first eight bytes is read.
    pub(crate) fn from_reader<R: Read>(rdr: &mut R) -> Result<Self, CrilaylaError> {
        let mut sig = [0u8; 8];
        rdr.read_exact(&mut sig)?;
        let signature = Signature::from_bytes(&sig)?;

        let mut size = [0u8; 4];
        let mut offset = [0u8; 4];
        rdr.read_exact(&mut size)?; // 8..12
        rdr.read_exact(&mut offset)?; // 12..16

        Ok(Self {
            signature,
            uncompressed_size: u32::from_le_bytes(size),
            header_offset: u32::from_le_bytes(offset),
        })
    }
    /// Parse a prologue from the start of a byte slice
    pub fn from_slice(bytes: &[u8]) -> Result<Self, CrilaylaError> {
        let mut rdr = bytes;
        Self::from_reader(&mut rdr)
    }
    /// Check that the header block ends exactly at the end of a segment of `segment_len` bytes
    pub fn check_framing(&self, segment_len: u64) -> Result<(), CrilaylaError> {
        if self.segment_len() == segment_len {
            Ok(())
        } else {
            Err(CrilaylaError::FramingMismatch {
                header_offset: self.header_offset,
                segment_len,
            })
        }
    }
    /// Total segment size implied by the header block offset
    pub fn segment_len(&self) -> u64 {
        (PROLOGUE_SIZE + HEADER_BLOCK_SIZE) as u64 + u64::from(self.header_offset)
    }
    /// Size of the compressed payload between the prologue and the header block
    #[inline]
    pub fn payload_len(&self) -> usize {
        self.header_offset as usize
    }
    /// Size of the fully decompressed output, header block included
    #[inline]
    pub fn output_len(&self) -> usize {
        HEADER_BLOCK_SIZE + self.uncompressed_size as usize
    }
}

impl fmt::Display for SegmentHeader {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "{} segment: {:#x} byte payload -> {:#x} bytes (+{:#x} header block)",
            self.signature, self.header_offset, self.uncompressed_size, HEADER_BLOCK_SIZE
        )
    }
}

/// A CPK file entry is stored compressed when its extracted size is larger
/// than the number of bytes it occupies in the archive.
#[inline]
pub fn needs_decompression(stored_size: u64, extract_size: u64) -> bool {
    extract_size > stored_size
}
