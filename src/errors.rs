use std::io;
use thiserror::Error;

/// Possible errors that arise from attempting to decompress a CRILAYLA segment.
///
/// Every variant is fatal for the segment being decoded; nothing is retried.
#[derive(Error, Debug)]
pub enum CrilaylaError {
    #[error("Expected \"CRILAYLA\" or zero signature for compressed data, found {0:02x?}")]
    BadSignature([u8; 8]),

    #[error(
        "Segment framing mismatch: header block at +0x10+{header_offset:#x} does not end segment of {segment_len:#x} bytes"
    )]
    FramingMismatch { header_offset: u32, segment_len: u64 },

    #[error("Unable to allocate {0:#x} bytes for the decompressed output")]
    AllocationFailure(usize),

    #[error("Compressed stream ran out: {requested} bits requested with {remaining} remaining")]
    OutOfBits { requested: u32, remaining: u64 },

    #[error("Back-reference at {position:#06x} reads from {from:#06x}, outside the output")]
    BadBackReference { position: usize, from: usize },

    #[error("Back-reference of {length} bytes overruns the {remaining} bytes left to decode")]
    LengthOverrun { length: usize, remaining: usize },

    #[error("Decompressed {actual:#x} bytes, but the container expected {expected:#x}")]
    ExtractSizeMismatch { expected: u64, actual: u64 },

    #[error("{0}")]
    Io(#[from] io::Error),
}
