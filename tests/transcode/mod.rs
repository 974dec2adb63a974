use pngstage::{
  header::{validate, CompressionMethod},
  writer::write_png, BitDepth, ColorType, ErrorKind, FilterStrategy, FilterType, ImageMetadata,
  InterlaceMethod, PngError, Stage, TranscodeConfig, Transcoder,
};

/// Random pixels for the image, with the unused low bits at the end of each
/// row cleared (those bits never survive a trip through Adam7).
fn rand_pixels(metadata: &ImageMetadata) -> Vec<u8> {
  let format = metadata.pixel_format();
  let row_bytes = format.bytes_per_row(metadata.width).unwrap();
  let used_bits = format.bits_per_pixel() * metadata.width as usize;
  let mut pixels = super::rand_bytes(metadata.raw_len().unwrap());
  if used_bits % 8 != 0 {
    let mask = 0xFF_u8 << (8 - used_bits % 8);
    for row in pixels.chunks_exact_mut(row_bytes) {
      *row.last_mut().unwrap() &= mask;
    }
  }
  pixels
}

fn rand_metadata(bit_depth: u8, color_type: u8, interlace: InterlaceMethod) -> ImageMetadata {
  let dims = super::rand_bytes(2);
  let format = validate(bit_depth, color_type).unwrap();
  ImageMetadata::new(
    1 + u32::from(dims[0] % 19),
    1 + u32::from(dims[1] % 13),
    format.bit_depth(),
    format.color_type(),
    interlace,
  )
  .unwrap()
}

#[test]
fn test_encode_then_decode_every_format() {
  for (bit_depth, color_type) in super::LEGAL_FORMATS {
    for interlace in [InterlaceMethod::None, InterlaceMethod::Adam7] {
      let metadata = rand_metadata(bit_depth, color_type, interlace);
      let pixels = rand_pixels(&metadata);
      let mut encoder =
        Transcoder::from_raw_pixels(metadata, pixels.clone(), TranscodeConfig::default()).unwrap();
      let png = encoder.to_png_bytes().unwrap();
      assert_eq!(encoder.stage(), Stage::Compressed);

      let mut decoder = Transcoder::from_png_bytes(&png).unwrap();
      assert_eq!(decoder.metadata(), &metadata);
      decoder.transcode(Stage::Raw).unwrap();
      assert_eq!(decoder.data(), pixels.as_slice(), "{metadata:?}");
    }
  }
}

#[test]
fn test_every_stage_round_trips_byte_exact() {
  for (bit_depth, color_type) in [(8, 6), (2, 0), (16, 2)] {
    for interlace in [InterlaceMethod::None, InterlaceMethod::Adam7] {
      let metadata = rand_metadata(bit_depth, color_type, interlace);
      let mut t =
        Transcoder::from_raw_pixels(metadata, rand_pixels(&metadata), Default::default()).unwrap();
      t.transcode(Stage::Compressed).unwrap();
      // snapshot each stage on the way up, then check each on the way back
      let mut seen = vec![(Stage::Compressed, t.data().to_vec())];
      for stage in [Stage::Interlaced, Stage::Filtered, Stage::Raw] {
        t.transcode(stage).unwrap();
        seen.push((stage, t.data().to_vec()));
      }
      for (stage, bytes) in seen.iter().rev() {
        t.transcode(*stage).unwrap();
        assert_eq!(t.stage(), *stage);
        assert_eq!(t.data(), bytes.as_slice(), "{stage} of {metadata:?}");
        // same stage is a no-op
        t.transcode(*stage).unwrap();
        assert_eq!(t.data(), bytes.as_slice());
      }
    }
  }
}

#[test]
fn test_fixed_filter_strategies_round_trip() {
  let metadata =
    ImageMetadata::new(9, 7, BitDepth::Sixteen, ColorType::GrayscaleAlpha, InterlaceMethod::Adam7)
      .unwrap();
  let pixels = rand_pixels(&metadata);
  for filter_type in FilterType::ALL {
    let config = TranscodeConfig {
      filter_strategy: FilterStrategy::Fixed(filter_type),
      preserve_filters: false,
      ..Default::default()
    };
    let mut t = Transcoder::from_raw_pixels(metadata, pixels.clone(), config).unwrap();
    t.transcode(Stage::Filtered).unwrap();
    t.transcode(Stage::Raw).unwrap();
    assert_eq!(t.data(), pixels.as_slice());
    assert!(t.filter_plan().iter().all(|&f| f == filter_type));
    // one plan entry per scanline of every non-empty pass
    let rows: u32 = metadata.sub_images().filter(|s| !s.is_empty()).map(|s| s.height).sum();
    assert_eq!(t.filter_plan().len(), rows as usize);
  }
}

#[test]
fn test_chunk_splitting_on_write() {
  let metadata =
    ImageMetadata::new(32, 32, BitDepth::Eight, ColorType::Truecolor, InterlaceMethod::None)
      .unwrap();
  let config = TranscodeConfig { compression_level: 0, max_chunk_len: 100, ..Default::default() };
  let mut t = Transcoder::from_raw_pixels(metadata, rand_pixels(&metadata), config).unwrap();
  let png = t.to_png_bytes().unwrap();
  let compressed_len = t.data().len();
  let reread = Transcoder::from_png_bytes(&png).unwrap();
  let idats = reread.chunk_index().offsets(pngstage::ChunkType::IDAT).len();
  assert_eq!(idats, compressed_len.div_ceil(100));
  assert_eq!(reread.data(), t.data());
}

#[test]
fn test_invalid_targets() {
  let metadata =
    ImageMetadata::new(2, 2, BitDepth::One, ColorType::Indexed, InterlaceMethod::None).unwrap();
  let mut t = Transcoder::from_raw_pixels(metadata, vec![0x80, 0x40], Default::default()).unwrap();
  for id in [4, 5, 200, 255] {
    assert_eq!(t.transcode_to_id(id).unwrap_err(), PngError::InvalidTarget(id));
    assert_eq!(t.stage(), Stage::Raw);
  }
  assert_eq!(Stage::try_from(7).unwrap_err().kind(), ErrorKind::InvalidTarget);
}

#[test]
fn test_corrupt_zlib_stays_compressed() {
  let metadata =
    ImageMetadata::new(4, 4, BitDepth::Eight, ColorType::Grayscale, InterlaceMethod::None)
      .unwrap();
  let mut t = Transcoder::from_raw_pixels(metadata, vec![3; 16], Default::default()).unwrap();
  let mut png = t.to_png_bytes().unwrap();
  // clobber the zlib data inside the IDAT chunk and then fix up its CRC, so
  // only the codec can notice.
  let idat_at = 8 + 25;
  let len = u32::from_be_bytes(png[idat_at..idat_at + 4].try_into().unwrap()) as usize;
  for b in &mut png[idat_at + 8..idat_at + 8 + len] {
    *b = 0xFF;
  }
  let crc = pngstage::crc32::crc32(&png[idat_at + 4..idat_at + 8 + len]);
  png[idat_at + 8 + len..idat_at + 12 + len].copy_from_slice(&crc.to_be_bytes());

  let mut t = Transcoder::from_png_bytes(&png).unwrap();
  let before = t.data().to_vec();
  assert_eq!(t.transcode(Stage::Raw).unwrap_err().kind(), ErrorKind::Compression);
  assert_eq!(t.stage(), Stage::Compressed);
  assert_eq!(t.data(), before.as_slice());
}

#[test]
fn test_foreign_stream_returns_to_the_same_bytes() {
  // a stream from some other encoder, at a level this crate wouldn't pick
  let metadata =
    ImageMetadata::new(12, 9, BitDepth::Eight, ColorType::Truecolor, InterlaceMethod::Adam7)
      .unwrap();
  let mut t = Transcoder::from_raw_pixels(metadata, rand_pixels(&metadata), Default::default())
    .unwrap();
  t.transcode(Stage::Interlaced).unwrap();
  let zlib = CompressionMethod::Deflate.compress(t.data(), 1).unwrap();
  let png = write_png(&metadata, &zlib, 64);

  let mut t = Transcoder::from_png_bytes(&png).unwrap();
  assert_eq!(t.data(), zlib.as_slice());
  t.transcode(Stage::Interlaced).unwrap();
  t.transcode(Stage::Compressed).unwrap();
  assert_eq!(t.data(), zlib.as_slice());
  // all the way down and back up again also keeps the source stream
  t.transcode(Stage::Raw).unwrap();
  t.transcode(Stage::Compressed).unwrap();
  assert_eq!(t.data(), zlib.as_slice());
  let rewritten = t.to_png_bytes().unwrap();
  assert_eq!(pngstage::parse_stream(&rewritten).unwrap().payload, zlib);
}
