//! # crilayla
//! A library for decompressing CRI's CRILAYLA segments, the compressed file
//! entries found in CPK archives.
//!
//! ## Decoding
//! ```
//! # fn segment() -> Vec<u8> {
//! #     let mut s = b"CRILAYLA".to_vec();
//! #     s.extend_from_slice(&[0; 8]);
//! #     s.extend_from_slice(&[0xAA; 0x100]);
//! #     s
//! # }
//! let compressed = segment();
//! let decompressed = crilayla::Decoder::for_bytes(&compressed)
//!     .decode()
//!     .unwrap();
//! // the uncompressed header block always comes first
//! assert_eq!(&decompressed[..0x100], &[0xAA; 0x100][..]);
//! ```
//! See [`format`] for the layout of a segment.

mod bitreader;
mod decode;
mod errors;
pub mod format;

pub use bitreader::{ReverseBitReader, ReverseBytes};
pub use decode::{decode, decode_segment, segment_info, Decoder};
pub use errors::CrilaylaError;
pub use format::{needs_decompression, SegmentHeader, Signature};
