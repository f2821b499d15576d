use crate::bitreader::ReverseBitReader;
use crate::errors::CrilaylaError;
use crate::format::{
    SegmentHeader, DISTANCE_BITS, HEADER_BLOCK_SIZE, LENGTH_WIDTHS, MIN_MATCH, PROLOGUE_SIZE,
};
use smallvec::SmallVec;
use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufReader, BufWriter, Cursor, Read, Seek, SeekFrom, Write},
    path::Path,
};

type LogWtr<'a> = &'a mut dyn Write;
// the raw groups read for one back-reference length
type LengthGroups = SmallVec<[u8; 4]>;

/// Specify the decoding settings, such as logging, input, and output.
///
/// To create a new `Decoder`, use [`for_reader()`], [`for_bytes()`], or
/// [`for_file()`]. Then, change any of the decoder settings.
/// Finally, decode the input data with [`decode()`].
///
/// By default, the whole input is treated as one segment. Use [`segment()`]
/// to decode a segment that sits inside a larger container, like a CPK archive:
/// ```
/// # use crilayla::Decoder;
/// # fn cpk_bytes() -> Vec<u8> { vec![0; 0x130] }
/// let cpk = cpk_bytes();
/// let result = Decoder::for_bytes(&cpk)
///     .segment(0x10, 0x110)
///     .expect_size(0x100)
///     .decode();
/// assert!(result.is_ok());
/// ```
/// You can use a `Decoder` to get the [`SegmentHeader`] with [`header()`]
/// before decoding anything:
/// ```
/// # use crilayla::Decoder;
/// let mut segment = b"CRILAYLA".to_vec();
/// segment.extend_from_slice(&0x20u32.to_le_bytes());
/// segment.extend_from_slice(&0x00u32.to_le_bytes());
/// segment.extend_from_slice(&[0; 0x100]);
///
/// let mut decoder = Decoder::for_bytes(&segment);
/// let size = decoder.header().unwrap().uncompressed_size;
/// assert_eq!(size, 0x20);
/// ```
/// [`for_reader()`]: Decoder::for_reader
/// [`for_bytes()`]: Decoder::for_bytes
/// [`for_file()`]: Decoder::for_file
/// [`decode()`]: Decoder::decode
/// [`segment()`]: Decoder::segment
/// [`header()`]: Decoder::header
pub struct Decoder<'a, R: Read + Seek> {
    src: R,
    start: u64,
    len: Option<u64>,
    expected: Option<u64>,
    log: Option<LogWtr<'a>>,
    header: Option<SegmentHeader>,
}

impl<'a, R: Read + Seek> Decoder<'a, R> {
    #[inline]
    pub fn for_reader(rdr: R) -> Self {
        Self {
            src: rdr,
            start: 0,
            len: None,
            expected: None,
            log: None,
            header: None,
        }
    }

    /// Decode the `len` byte segment that starts at `offset` in the input,
    /// instead of the whole input.
    #[inline]
    pub fn segment(&mut self, offset: u64, len: u64) -> &mut Self {
        self.start = offset;
        self.len = Some(len);
        self.header = None;
        self
    }

    /// Fail the decode if the decompressed output, header block included,
    /// is not `size` bytes. CPK archives store this as a file's `ExtractSize`.
    #[inline]
    pub fn expect_size(&mut self, size: u64) -> &mut Self {
        self.expected = Some(size);
        self
    }

    /// Write debugging and diagnostic information to `log` while the segment is
    /// being decoded.
    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// Read the segment's prologue, and check that it matches the segment length
    #[inline]
    pub fn header(&mut self) -> Result<SegmentHeader, CrilaylaError> {
        self.get_header()
    }

    #[inline]
    pub fn decode(&mut self) -> Result<Vec<u8>, CrilaylaError> {
        do_decode(self)
    }

    /// Decode the segment and write the output to `wtr`
    #[inline]
    pub fn decode_to_writer<W: Write>(&mut self, wtr: W) -> Result<(), CrilaylaError> {
        let output = do_decode(self)?;
        write_output(&output, wtr)
    }

    /// Decode the segment and write the output to the newly created `File` at `path`.
    ///
    /// The file is only created once the segment has been successfully decoded.
    pub fn decode_to_file<P: AsRef<Path>>(&mut self, path: P) -> Result<(), CrilaylaError> {
        let output = do_decode(self)?;
        let f = File::create(path).map(BufWriter::new)?;
        write_output(&output, f)
    }

    fn segment_len(&mut self) -> Result<u64, CrilaylaError> {
        if let Some(len) = self.len {
            Ok(len)
        } else {
            let end = self.src.seek(SeekFrom::End(0))?;
            let len = end.saturating_sub(self.start);
            self.len = Some(len);
            Ok(len)
        }
    }

    fn get_header(&mut self) -> Result<SegmentHeader, CrilaylaError> {
        if let Some(hdr) = self.header {
            return Ok(hdr);
        }

        let len = self.segment_len()?;
        self.src.seek(SeekFrom::Start(self.start))?;
        let hdr = SegmentHeader::from_reader(&mut self.src)?;
        hdr.check_framing(len)?;

        self.header = Some(hdr);
        Ok(hdr)
    }
}

impl<'a> Decoder<'a, Cursor<&'a [u8]>> {
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        let rdr = Cursor::new(bytes);
        Self::for_reader(rdr)
    }
}

impl<'a> Decoder<'a, BufReader<File>> {
    #[inline]
    pub fn for_file<P: AsRef<Path>>(p: P) -> Result<Self, CrilaylaError> {
        File::open(p)
            .map(BufReader::new)
            .map(Self::for_reader)
            .map_err(Into::into)
    }
}

/// Decompress a CRILAYLA segment that takes up all of `rdr` into a `Vec<u8>`
///
/// This is a convenience function to decode a `Read`er without
/// having to import and set up a [`Decoder`]
pub fn decode<R: Read + Seek>(rdr: R) -> Result<Vec<u8>, CrilaylaError> {
    Decoder::for_reader(rdr).decode()
}

/// Decompress the `segment_length` byte CRILAYLA segment found at `segment_start_offset`
/// in `source`
pub fn decode_segment<R: Read + Seek>(
    source: R,
    segment_start_offset: u64,
    segment_length: u64,
) -> Result<Vec<u8>, CrilaylaError> {
    Decoder::for_reader(source)
        .segment(segment_start_offset, segment_length)
        .decode()
}

/// Extract the [`SegmentHeader`] from a CRILAYLA segment that takes up all of `rdr`
///
/// This is a convenience function to extract information about a segment without having
/// to set up a [`Decoder`]
pub fn segment_info<R: Read + Seek>(rdr: R) -> Result<SegmentHeader, CrilaylaError> {
    Decoder::for_reader(rdr).header()
}

fn do_decode<R: Read + Seek>(opt: &mut Decoder<R>) -> Result<Vec<u8>, CrilaylaError> {
    let header = opt.get_header()?;
    let Decoder {
        src,
        start,
        expected,
        log,
        ..
    } = opt;

    let output_len = header.output_len();
    if let Some(expected) = *expected {
        if expected != output_len as u64 {
            return Err(CrilaylaError::ExtractSizeMismatch {
                expected,
                actual: output_len as u64,
            });
        }
    }

    // set up the log with a map to count the length cascade depths
    let mut log = log.as_mut().map(|l| (l, LogFreq::new()));

    if let Some((wtr, _)) = &mut log {
        writeln!(wtr, "# Segment @ {:#x}\n{}", start, header)?;
        writeln!(wtr, "###> {:?}", header)?;
        writeln!(wtr)?;
    }

    // everything after the prologue: payload, then the header block
    let body_len = header.payload_len() + HEADER_BLOCK_SIZE;
    let mut body = alloc(body_len)?;
    body.resize(body_len, 0);
    src.seek(SeekFrom::Start(*start + PROLOGUE_SIZE as u64))?;
    src.read_exact(&mut body)?;
    let (payload, block) = body.split_at(header.payload_len());

    let mut output = alloc(output_len)?;
    output.extend_from_slice(block);
    output.resize(output_len, 0);

    let size = header.uncompressed_size as usize;
    let output_end = output_len - 1;
    let mut bits = ReverseBitReader::new(payload);
    let mut written = 0;

    while written < size {
        let pos = output_end - written;

        if bits.read_bit()? {
            let distance = bits.read_bits(DISTANCE_BITS)? as usize;
            let (length, groups) = read_length(&mut bits)?;
            let from = pos + distance + MIN_MATCH;

            if from >= output_len {
                return Err(CrilaylaError::BadBackReference { position: pos, from });
            }
            let remaining = size - written;
            if length > remaining {
                return Err(CrilaylaError::LengthOverrun { length, remaining });
            }

            if let Some((wtr, map)) = &mut log {
                writeln!(
                    wtr,
                    "{:04x} - Encoded [Copyback]: length: {} {:?} distance: {} | from: {:04x}",
                    pos,
                    length,
                    groups.as_slice(),
                    distance,
                    from
                )?;
                *map.groups.entry(groups.len()).or_insert(0) += 1;
                map.copybacks += 1;
                map.copied += length;
            }

            // the source stays `distance + 3` bytes above the output,
            // so each byte it reads has already been written
            for i in 0..length {
                output[pos - i] = output[from - i];
            }
            written += length;

            if let Some((wtr, _)) = &mut log {
                writeln!(wtr, "\t{:02x?}", &output[pos + 1 - length..=pos])?;
            }
        } else {
            let byte = bits.read_bits(8)? as u8;
            output[pos] = byte;
            written += 1;

            if let Some((wtr, map)) = &mut log {
                writeln!(wtr, "{:04x} - Uncoded: {:02x}", pos, byte)?;
                map.literals += 1;
            }
        }
    }

    if let Some((wtr, map)) = &mut log {
        writeln!(wtr)?;
        writeln!(wtr, "# Summary")?;
        writeln!(
            wtr,
            "uncoded: {} | copybacks: {} ({} bytes) | unread bits: {}",
            map.literals,
            map.copybacks,
            map.copied,
            bits.bits_remaining()
        )?;
        for (depth, count) in &map.groups {
            writeln!(wtr, "  {} length group(s): {}", depth, count)?;
        }
    }

    Ok(output)
}

/// Read a back-reference length: three, plus a cascade of 2, 3, 5, and 8 bit groups,
/// then as many 8 bit groups as needed. Each all-ones group means another group follows.
pub(crate) fn read_length(
    bits: &mut ReverseBitReader,
) -> Result<(usize, LengthGroups), CrilaylaError> {
    let mut length = MIN_MATCH;
    let mut groups = LengthGroups::new();

    for &width in LENGTH_WIDTHS.iter() {
        let value = bits.read_bits(width)?;
        length += value as usize;
        groups.push(value as u8);

        if value != (1 << width) - 1 {
            return Ok((length, groups));
        }
    }

    // the tail can only be as long as the payload has bits for
    loop {
        let value = bits.read_bits(8)?;
        length += value as usize;
        groups.push(value as u8);

        if value != 0xFF {
            return Ok((length, groups));
        }
    }
}

fn write_output<W: Write>(output: &[u8], mut wtr: W) -> Result<(), CrilaylaError> {
    wtr.write_all(output)?;
    wtr.flush().map_err(Into::into)
}

/// An empty buffer with room for `size` bytes, or an error if that much memory isn't available
fn alloc(size: usize) -> Result<Vec<u8>, CrilaylaError> {
    let mut buf = Vec::new();
    buf.try_reserve_exact(size)
        .map_err(|_| CrilaylaError::AllocationFailure(size))?;

    Ok(buf)
}

#[derive(Debug)]
struct LogFreq {
    literals: usize,
    copybacks: usize,
    copied: usize,
    // number of length groups => times seen
    groups: BTreeMap<usize, u32>,
}

impl LogFreq {
    fn new() -> Self {
        Self {
            literals: 0,
            copybacks: 0,
            copied: 0,
            groups: BTreeMap::new(),
        }
    }
}
