use pngstage::{
  chunk::{RawChunkIter, PNG_SIGNATURE},
  compress::MAX_COMPRESSION_LEVEL,
  header::CompressionMethod,
  parse_stream,
  writer::write_chunk,
  BitDepth, ChunkType, ColorType, ErrorKind, InterlaceMethod, Stage, Transcoder,
};

const IHDR_1X1_Y8: [u8; 13] = [0, 0, 0, 1, 0, 0, 0, 1, 8, 0, 0, 0, 0];

fn stream(chunks: &[(ChunkType, &[u8])]) -> Vec<u8> {
  let mut out = PNG_SIGNATURE.to_vec();
  for (ty, data) in chunks {
    write_chunk(&mut out, *ty, data);
  }
  out
}

fn one_gray_pixel(value: u8) -> Vec<u8> {
  let idat = CompressionMethod::Deflate.compress(&[0, value], 6).unwrap();
  stream(&[(ChunkType::IHDR, &IHDR_1X1_Y8), (ChunkType::IDAT, &idat), (ChunkType::IEND, &[])])
}

#[test]
fn test_single_gray_pixel_end_to_end() {
  let mut t = Transcoder::from_png_bytes(&one_gray_pixel(42)).unwrap();
  let m = *t.metadata();
  assert_eq!((m.width, m.height), (1, 1));
  assert_eq!(m.bit_depth, BitDepth::Eight);
  assert_eq!(m.color_type, ColorType::Grayscale);
  assert_eq!(m.interlace_method, InterlaceMethod::None);
  assert_eq!(t.stage(), Stage::Compressed);
  t.transcode(Stage::Raw).unwrap();
  assert_eq!(t.data(), &[42]);
}

#[test]
fn test_bad_signature_fails_before_chunks() {
  let mut bytes = one_gray_pixel(42);
  bytes[1] = b'p';
  let err = parse_stream(&bytes).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::Format);
  assert!(RawChunkIter::new(&bytes).is_err());
  assert!(RawChunkIter::new(&[]).is_err());
  assert!(RawChunkIter::new(&PNG_SIGNATURE[..7]).is_err());
}

#[test]
fn test_payload_before_metadata_is_a_sequence_error() {
  let idat = CompressionMethod::Deflate.compress(&[0, 42], 6).unwrap();
  let bytes =
    stream(&[(ChunkType::IDAT, &idat), (ChunkType::IHDR, &IHDR_1X1_Y8), (ChunkType::IEND, &[])]);
  assert_eq!(Transcoder::from_png_bytes(&bytes).unwrap_err().kind(), ErrorKind::Sequence);
}

#[test]
fn test_any_single_corruption_is_an_integrity_error() {
  let clean = one_gray_pixel(42);
  // walk every chunk's type and data bytes
  let spans: Vec<(usize, usize)> = RawChunkIter::new(&clean)
    .unwrap()
    .map(|c| c.unwrap())
    .map(|c| (c.offset + 4, c.offset + 8 + c.data.len()))
    .collect();
  for (start, end) in spans {
    for i in start..end {
      for flip in [0x01, 0x80, 0xFF] {
        let mut bytes = clean.clone();
        bytes[i] ^= flip;
        let err = parse_stream(&bytes).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Integrity, "byte {i} ^ {flip:#x}: {err}");
      }
    }
  }
}

#[test]
fn test_ancillary_chunks_are_skipped_but_indexed() {
  let idat = CompressionMethod::Deflate.compress(&[0, 7], MAX_COMPRESSION_LEVEL).unwrap();
  let bytes = stream(&[
    (ChunkType::IHDR, &IHDR_1X1_Y8),
    (ChunkType::tEXt, b"Comment\0hello"),
    (ChunkType::gAMA, &45455_u32.to_be_bytes()),
    (ChunkType(*b"zzZz"), &[1, 2, 3]),
    (ChunkType::IDAT, &idat),
    (ChunkType::tEXt, b"Author\0nobody"),
    (ChunkType::IEND, &[]),
  ]);
  let mut t = Transcoder::from_png_bytes(&bytes).unwrap();
  let index = t.chunk_index();
  assert_eq!(index.offsets(ChunkType::tEXt).len(), 2);
  assert!(index.contains(ChunkType(*b"zzZz")));
  assert_eq!(index.len(), 6);
  t.transcode(Stage::Raw).unwrap();
  assert_eq!(t.data(), &[7]);
}

#[test]
fn test_split_payload_and_trailing_bytes() {
  let idat = CompressionMethod::Deflate.compress(&[0, 99], 0).unwrap();
  let (a, b) = idat.split_at(idat.len() / 2);
  let mut bytes = stream(&[
    (ChunkType::IHDR, &IHDR_1X1_Y8),
    (ChunkType::IDAT, a),
    (ChunkType::IDAT, &[]),
    (ChunkType::IDAT, b),
    (ChunkType::IEND, &[]),
  ]);
  bytes.extend_from_slice(b"garbage after the end");
  let parsed = parse_stream(&bytes).unwrap();
  assert_eq!(parsed.payload, idat);
  let mut t = Transcoder::from_png_bytes(&bytes).unwrap();
  t.transcode(Stage::Raw).unwrap();
  assert_eq!(t.data(), &[99]);
}

#[test]
fn test_illegal_header_is_rejected_at_parse_time() {
  for (bit_depth, color_type) in [(16, 3), (4, 2), (2, 6), (8, 1), (3, 0)] {
    let mut ihdr = IHDR_1X1_Y8;
    ihdr[8] = bit_depth;
    ihdr[9] = color_type;
    let bytes = stream(&[(ChunkType::IHDR, &ihdr), (ChunkType::IEND, &[])]);
    assert_eq!(parse_stream(&bytes).unwrap_err().kind(), ErrorKind::InvalidHeader);
  }
  let mut zero_wide = IHDR_1X1_Y8;
  zero_wide[3] = 0;
  let bytes = stream(&[(ChunkType::IHDR, &zero_wide), (ChunkType::IEND, &[])]);
  assert_eq!(parse_stream(&bytes).unwrap_err().kind(), ErrorKind::InvalidHeader);
}

#[test]
fn test_huge_header_is_an_error_not_a_panic() {
  // 2^31-1 square at 16-bit RGBA is 8 bytes per pixel
  let ihdr = [0x7F, 0xFF, 0xFF, 0xFF, 0x7F, 0xFF, 0xFF, 0xFF, 16, 6, 0, 0, 0];
  let idat = CompressionMethod::Deflate.compress(&[0; 64], 6).unwrap();
  let bytes = stream(&[(ChunkType::IHDR, &ihdr), (ChunkType::IDAT, &idat), (ChunkType::IEND, &[])]);
  let err = Transcoder::from_png_bytes(&bytes).unwrap_err();
  assert_eq!(err.kind(), ErrorKind::InvalidHeader);
  assert_eq!(parse_stream(&bytes).unwrap_err(), err);
}

#[test]
fn test_RawChunkIter_no_panics() {
  // even totally random data should never panic the iterator or the parser!
  for _ in 0..20 {
    let v = super::rand_bytes(1024);
    for _ in RawChunkIter::new(&v).into_iter().flatten() {
      //
    }
    let mut signed = PNG_SIGNATURE.to_vec();
    signed.extend_from_slice(&v);
    for _ in RawChunkIter::new(&signed).unwrap() {
      //
    }
    assert!(parse_stream(&signed).is_err());
  }
  // and truncating a good stream anywhere is an error, not a panic
  let good = one_gray_pixel(1);
  for len in 0..good.len() {
    assert!(parse_stream(&good[..len]).is_err());
  }
}
