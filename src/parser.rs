//! Turns a whole PNG byte stream into metadata plus one compressed payload.

use alloc::vec::Vec;

use log::{debug, info, trace};

use crate::{
  chunk::{ChunkIndex, ChunkType, RawChunkIter},
  header::ImageMetadata,
  PngError, PngResult,
};

/// Everything the pipeline needs out of a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedStream {
  pub metadata: ImageMetadata,
  /// Where every chunk was found, including the skipped ones.
  pub chunks: ChunkIndex,
  /// All `IDAT` payloads concatenated in stream order: a single zlib stream.
  pub payload: Vec<u8>,
}

/// Parses a PNG stream that's entirely in memory.
///
/// * The signature must be correct and every chunk's CRC must match.
/// * The `IHDR` chunk must come before any `IDAT` chunk (and before `IEND`),
///   and must appear only once.
/// * At least one `IDAT` chunk must be present.
/// * Any other chunk type is logged and skipped.
/// * Parsing stops at `IEND`. Bytes after it are ignored.
pub fn parse_stream(bytes: &[u8]) -> PngResult<ParsedStream> {
  let mut it = RawChunkIter::new(bytes)?;
  let mut metadata: Option<ImageMetadata> = None;
  let mut chunks = ChunkIndex::new();
  let mut payload = Vec::new();

  for chunk in &mut it {
    let chunk = chunk?;
    trace!("{chunk:?}");
    let out_of_sequence = |reason: &'static str| PngError::Sequence {
      chunk: chunk.chunk_type,
      offset: chunk.offset,
      reason,
    };
    match chunk.chunk_type {
      ChunkType::IHDR => {
        if metadata.is_some() {
          return Err(out_of_sequence("only one IHDR chunk is allowed"));
        }
        let ihdr = ImageMetadata::from_chunk_data(chunk.data)?;
        debug!("{ihdr:?}");
        metadata = Some(ihdr);
      }
      ChunkType::IDAT => {
        if metadata.is_none() {
          return Err(out_of_sequence("IDAT before IHDR"));
        }
        payload.extend_from_slice(chunk.data);
      }
      ChunkType::IEND => {
        if metadata.is_none() {
          return Err(out_of_sequence("IEND before IHDR"));
        }
      }
      other => {
        info!("skipping {other} chunk ({} bytes) at byte {}", chunk.data.len(), chunk.offset);
      }
    }
    chunks.record(chunk.chunk_type, chunk.offset);
  }

  // The iterator only finishes cleanly right after IEND, which already
  // required an IHDR.
  let metadata = metadata.ok_or(PngError::Format {
    offset: it.position(),
    reason: "stream ended without an IHDR chunk",
  })?;
  if !chunks.contains(ChunkType::IDAT) {
    return Err(PngError::Format { offset: it.position(), reason: "stream has no IDAT chunk" });
  }
  let trailing = bytes.len() - it.position();
  if trailing > 0 {
    debug!("ignoring {trailing} bytes after IEND");
  }
  Ok(ParsedStream { metadata, chunks, payload })
}
