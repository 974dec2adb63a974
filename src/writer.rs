//! Chunk serialization, the inverse of [`RawChunkIter`](crate::chunk::RawChunkIter).

use alloc::vec::Vec;

use log::trace;

use crate::{
  chunk::{ChunkType, MAX_CHUNK_LEN, PNG_SIGNATURE},
  crc32::chunk_crc,
  header::ImageMetadata,
};

/// Appends one chunk: length, type, data, then the CRC of type and data.
///
/// `data` must be at most 2^31-1 bytes, the longest chunk the format can
/// express. [`write_png`] already splits its payload to fit. This is only
/// checked in debug builds.
pub fn write_chunk(out: &mut Vec<u8>, chunk_type: ChunkType, data: &[u8]) {
  debug_assert!(data.len() <= MAX_CHUNK_LEN as usize, "chunk data too long");
  trace!("writing {chunk_type} chunk of {} bytes at byte {}", data.len(), out.len());
  out.reserve(12 + data.len());
  out.extend_from_slice(&(data.len() as u32).to_be_bytes());
  out.extend_from_slice(&chunk_type.to_bytes());
  out.extend_from_slice(data);
  out.extend_from_slice(&chunk_crc(chunk_type.to_bytes(), data).to_be_bytes());
}

/// A complete stream: signature, `IHDR`, the zlib payload split across as many
/// `IDAT` chunks as needed, and `IEND`.
///
/// `max_chunk_len` is clamped to `1 ..= 2^31-1`. An empty payload still gets
/// one (empty) `IDAT` chunk.
#[must_use]
pub fn write_png(metadata: &ImageMetadata, zlib_payload: &[u8], max_chunk_len: u32) -> Vec<u8> {
  let max = max_chunk_len.clamp(1, MAX_CHUNK_LEN) as usize;
  let idat_count = zlib_payload.len().div_ceil(max).max(1);
  let mut out = Vec::with_capacity(8 + 25 + zlib_payload.len() + 12 * idat_count + 12);
  out.extend_from_slice(&PNG_SIGNATURE);
  write_chunk(&mut out, ChunkType::IHDR, &metadata.to_chunk_data());
  if zlib_payload.is_empty() {
    write_chunk(&mut out, ChunkType::IDAT, &[]);
  }
  for part in zlib_payload.chunks(max) {
    write_chunk(&mut out, ChunkType::IDAT, part);
  }
  write_chunk(&mut out, ChunkType::IEND, &[]);
  out
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    chunk::RawChunkIter,
    header::{BitDepth, ColorType},
    interlace::InterlaceMethod,
  };

  #[test]
  fn test_write_chunk_layout() {
    let mut out = Vec::new();
    write_chunk(&mut out, ChunkType::IEND, &[]);
    assert_eq!(out, [0, 0, 0, 0, b'I', b'E', b'N', b'D', 0xAE, 0x42, 0x60, 0x82]);
  }

  #[test]
  fn test_write_png_splits_payload() {
    let metadata =
      ImageMetadata::new(3, 2, BitDepth::Eight, ColorType::Truecolor, InterlaceMethod::None)
        .unwrap();
    let payload: Vec<u8> = (0..10).collect();
    let png = write_png(&metadata, &payload, 4);
    let chunks: Vec<_> = RawChunkIter::new(&png).unwrap().map(|c| c.unwrap()).collect();
    let types: Vec<ChunkType> = chunks.iter().map(|c| c.chunk_type).collect();
    assert_eq!(
      types,
      [ChunkType::IHDR, ChunkType::IDAT, ChunkType::IDAT, ChunkType::IDAT, ChunkType::IEND]
    );
    assert_eq!(chunks[0].data, &metadata.to_chunk_data());
    assert_eq!(chunks[1].data, &[0, 1, 2, 3]);
    assert_eq!(chunks[3].data, &[8, 9]);
    assert!(chunks.iter().all(|c| c.verify().is_ok()));
  }

  #[test]
  fn test_write_png_empty_payload() {
    let metadata =
      ImageMetadata::new(1, 1, BitDepth::One, ColorType::Grayscale, InterlaceMethod::Adam7)
        .unwrap();
    let png = write_png(&metadata, &[], 0);
    let idat_count = RawChunkIter::new(&png)
      .unwrap()
      .filter(|c| c.as_ref().unwrap().chunk_type == ChunkType::IDAT)
      .count();
    assert_eq!(idat_count, 1);
  }

  #[test]
  fn test_write_png_clamps_chunk_len() {
    let metadata =
      ImageMetadata::new(1, 1, BitDepth::Eight, ColorType::Grayscale, InterlaceMethod::None)
        .unwrap();
    let payload = [5_u8; 20];
    // anything over the format's limit acts like the limit itself
    let png = write_png(&metadata, &payload, u32::MAX);
    assert_eq!(png, write_png(&metadata, &payload, MAX_CHUNK_LEN));
    let idats: Vec<_> = RawChunkIter::new(&png)
      .unwrap()
      .map(|c| c.unwrap())
      .filter(|c| c.chunk_type == ChunkType::IDAT)
      .collect();
    assert_eq!(idats.len(), 1);
    assert_eq!(idats[0].data, &payload);
  }
}
