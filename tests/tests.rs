use crilayla::{CrilaylaError, Decoder, Signature};
use proptest::prelude::*;
use std::io::Cursor;
use std::str::from_utf8;

/// Pack literal tokens into a payload, stored backwards like the real thing
fn literal_payload(literals: &[u8]) -> Vec<u8> {
    let mut bytes = Vec::new();
    let mut acc = 0u16;
    let mut n = 0;
    for &lit in literals {
        // flag bit 0, then the literal
        acc = (acc << 9) | u16::from(lit);
        n += 9;
        while n >= 8 {
            bytes.push((acc >> (n - 8)) as u8);
            n -= 8;
            acc &= (1 << n) - 1;
        }
    }
    if n > 0 {
        bytes.push((acc << (8 - n)) as u8);
    }
    bytes.reverse();
    bytes
}

fn segment(sig: &[u8; 8], size: u32, payload: &[u8], block: &[u8]) -> Vec<u8> {
    let mut seg = sig.to_vec();
    seg.extend_from_slice(&size.to_le_bytes());
    seg.extend_from_slice(&(payload.len() as u32).to_le_bytes());
    seg.extend_from_slice(payload);
    seg.extend_from_slice(block);
    seg
}

#[test]
fn decode_lorem() {
    let lorem_text = include_str!("lorem.txt");
    let lorem_cri = include_bytes!("lorem.crilayla");

    let mut lorem_reader = Cursor::new(lorem_cri.as_ref());

    let decoded = crilayla::decode(&mut lorem_reader).unwrap();
    let decoded_str = from_utf8(&decoded).unwrap();

    assert_eq!(decoded_str, lorem_text);
}

#[test]
fn decode_bad_file() {
    let bad_file = include_bytes!("bad-file.crilayla");
    let mut bf_r = Cursor::new(bad_file.as_ref());

    match crilayla::decode(&mut bf_r) {
        Err(CrilaylaError::FramingMismatch { segment_len, .. }) => {
            assert_eq!(segment_len, bad_file.len() as u64)
        }
        other => panic!("Expected framing error when decoding bad file, got {:?}", other),
    };
}

#[test]
fn lorem_info() {
    let lorem_cri = include_bytes!("lorem.crilayla");
    let lorem_text = include_bytes!("lorem.txt");

    let header = crilayla::segment_info(Cursor::new(lorem_cri.as_ref())).unwrap();
    assert_eq!(header.signature, Signature::Crilayla);
    assert_eq!(header.output_len(), lorem_text.len());
    assert_eq!(header.segment_len(), lorem_cri.len() as u64);
}

#[test]
fn decode_inside_container() {
    let lorem_text = include_bytes!("lorem.txt");
    let lorem_cri = include_bytes!("lorem.crilayla");

    let mut cpk = vec![0xEEu8; 0x800];
    cpk.extend_from_slice(lorem_cri);
    cpk.extend_from_slice(&[0xEE; 0x33]);

    let decoded =
        crilayla::decode_segment(Cursor::new(&cpk), 0x800, lorem_cri.len() as u64).unwrap();
    assert_eq!(decoded.as_slice(), lorem_text.as_ref());

    // a length that runs into the padding moves where the header block should be
    let err = crilayla::decode_segment(Cursor::new(&cpk), 0x800, lorem_cri.len() as u64 + 1);
    assert!(matches!(err, Err(CrilaylaError::FramingMismatch { .. })));
}

#[test]
fn expected_extract_size() {
    let lorem_text = include_bytes!("lorem.txt");
    let lorem_cri = include_bytes!("lorem.crilayla");

    let ok = Decoder::for_bytes(lorem_cri)
        .expect_size(lorem_text.len() as u64)
        .decode();
    assert!(ok.is_ok());

    match Decoder::for_bytes(lorem_cri).expect_size(0x1000).decode() {
        Err(CrilaylaError::ExtractSizeMismatch { expected, actual }) => {
            assert_eq!(expected, 0x1000);
            assert_eq!(actual, lorem_text.len() as u64);
        }
        other => panic!("Expected size mismatch, got {:?}", other),
    }
}

#[test]
fn decode_file_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("lorem.crilayla");
    let output = dir.path().join("lorem.txt");
    std::fs::write(&input, include_bytes!("lorem.crilayla")).unwrap();

    Decoder::for_file(&input)
        .unwrap()
        .decode_to_file(&output)
        .unwrap();

    let written = std::fs::read(&output).unwrap();
    assert_eq!(written.as_slice(), include_bytes!("lorem.txt").as_ref());
}

#[test]
fn bad_signature_reads_nothing_else() {
    // only the signature exists; any further read would be an io error instead
    let source = b"CRILAYLX";
    match crilayla::decode_segment(Cursor::new(source.as_ref()), 0, 0x1000) {
        Err(CrilaylaError::BadSignature(sig)) => assert_eq!(&sig, source),
        other => panic!("Expected bad signature, got {:?}", other),
    }
}

#[test]
fn zero_signature() {
    let block = [0x11u8; 0x100];
    let seg = segment(&[0; 8], 3, &literal_payload(b"abc"), &block);

    let mut decoder = Decoder::for_bytes(&seg);
    assert_eq!(decoder.header().unwrap().signature, Signature::Zero);

    let decoded = decoder.decode().unwrap();
    assert_eq!(&decoded[..0x100], &block[..]);
    assert_eq!(&decoded[0x100..], b"cba");
}

#[test]
fn truncated_source() {
    let seg = segment(b"CRILAYLA", 3, &literal_payload(b"abc"), &[0; 0x100]);
    // declared length matches the framing, but the source ends early
    let short = &seg[..seg.len() - 0x10];

    match crilayla::decode_segment(Cursor::new(short), 0, seg.len() as u64) {
        Err(CrilaylaError::Io(e)) => assert_eq!(e.kind(), std::io::ErrorKind::UnexpectedEof),
        other => panic!("Expected io error, got {:?}", other),
    }
}

proptest! {
    #[test]
    fn literal_segments(
        block in prop::collection::vec(any::<u8>(), 0x100),
        literals in prop::collection::vec(any::<u8>(), 0..300),
    ) {
        let seg = segment(b"CRILAYLA", literals.len() as u32, &literal_payload(&literals), &block);
        let decoded = Decoder::for_bytes(&seg).decode().unwrap();

        prop_assert_eq!(decoded.len(), 0x100 + literals.len());
        prop_assert_eq!(&decoded[..0x100], block.as_slice());
        let reversed: Vec<u8> = literals.iter().rev().copied().collect();
        prop_assert_eq!(&decoded[0x100..], reversed.as_slice());
    }
}
