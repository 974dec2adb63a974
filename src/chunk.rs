//! Chunk records: the length / type / payload / CRC framing of the stream.

use alloc::{collections::BTreeMap, vec::Vec};
use core::fmt::{Debug, Display, Write};

use crate::{crc32::chunk_crc, PngError, PngResult};

/// The first eight bytes of a PNG datastream should match these bytes.
pub const PNG_SIGNATURE: [u8; 8] = [137, 80, 78, 71, 13, 10, 26, 10];

/// Checks if the stream's initial 8 bytes are the PNG signature.
#[inline]
#[must_use]
pub const fn is_signature_correct(bytes: &[u8]) -> bool {
  matches!(bytes, [137, 80, 78, 71, 13, 10, 26, 10, ..])
}

/// Chunk lengths are limited to 31 bits by the format.
pub const MAX_CHUNK_LEN: u32 = i32::MAX as u32;

/// A four byte chunk type tag.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(transparent)]
pub struct ChunkType(pub [u8; 4]);
#[allow(nonstandard_style)]
impl ChunkType {
  /// Image header (the metadata chunk)
  pub const IHDR: Self = Self(*b"IHDR");
  /// Palette
  pub const PLTE: Self = Self(*b"PLTE");
  /// Image data (the payload chunk)
  pub const IDAT: Self = Self(*b"IDAT");
  /// Image end (the terminal chunk)
  pub const IEND: Self = Self(*b"IEND");
  pub const tRNS: Self = Self(*b"tRNS");
  pub const gAMA: Self = Self(*b"gAMA");
  pub const sRGB: Self = Self(*b"sRGB");
  pub const tEXt: Self = Self(*b"tEXt");

  /// Critical chunks have an uppercase first letter (bit 5 clear).
  #[inline]
  #[must_use]
  pub const fn is_critical(self) -> bool {
    (self.0[0] & 0b0010_0000) == 0
  }

  /// The raw tag bytes.
  #[inline]
  #[must_use]
  pub const fn to_bytes(self) -> [u8; 4] {
    self.0
  }
}
impl Debug for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    Display::fmt(self, f)
  }
}
impl Display for ChunkType {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    for b in self.0 {
      // non-ascii tags are garbage anyway, don't let them garble the output
      f.write_char(if b.is_ascii_graphic() { b as char } else { '?' })?;
    }
    Ok(())
  }
}

/// One chunk record, borrowed from the stream bytes.
///
/// These only live as long as it takes to validate and fold them into a
/// [`ParsedStream`](crate::ParsedStream).
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawChunk<'b> {
  /// Byte offset of the record's length field within the stream.
  pub offset: usize,
  pub chunk_type: ChunkType,
  pub data: &'b [u8],
  pub declared_len: u32,
  pub declared_crc: u32,
}
impl Debug for RawChunk<'_> {
  #[inline]
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("RawChunk")
      .field("offset", &self.offset)
      .field("chunk_type", &self.chunk_type)
      .field("data", &(&self.data[..self.data.len().min(12)], self.data.len()))
      .field("declared_crc", &self.declared_crc)
      .finish()
  }
}
impl RawChunk<'_> {
  /// The CRC of this chunk's type and payload as actually present.
  #[inline]
  #[must_use]
  pub fn computed_crc(&self) -> u32 {
    chunk_crc(self.chunk_type.0, self.data)
  }

  /// Checks the declared CRC against the computed one.
  pub fn verify(&self) -> PngResult<()> {
    let actual = self.computed_crc();
    if actual == self.declared_crc {
      Ok(())
    } else {
      Err(PngError::Integrity {
        chunk: self.chunk_type,
        offset: self.offset,
        declared: self.declared_crc,
        actual,
      })
    }
  }
}

/// Produces verified chunks from PNG bytes, up to and including `IEND`.
///
/// * Construction fails if the signature is wrong, before any chunk is read.
/// * Each chunk's CRC is checked before it's yielded.
/// * After `IEND`, or after any error, the iterator is finished.
#[derive(Debug, Clone)]
pub struct RawChunkIter<'b> {
  bytes: &'b [u8],
  pos: usize,
  finished: bool,
}
impl<'b> RawChunkIter<'b> {
  /// Pass the full PNG bytes, including the signature.
  pub fn new(bytes: &'b [u8]) -> PngResult<Self> {
    if !is_signature_correct(bytes) {
      return Err(PngError::Format { offset: 0, reason: "missing PNG signature" });
    }
    Ok(Self { bytes, pos: PNG_SIGNATURE.len(), finished: false })
  }

  /// Byte offset of the next record to be read.
  #[inline]
  #[must_use]
  pub const fn position(&self) -> usize {
    self.pos
  }

  fn read_chunk(&mut self) -> PngResult<RawChunk<'b>> {
    let offset = self.pos;
    let truncated = PngError::Format { offset, reason: "chunk extends past the end of the stream" };
    let rest = &self.bytes[offset..];
    if rest.is_empty() {
      return Err(PngError::Format { offset, reason: "stream ended without an IEND chunk" });
    }
    let (declared_len, chunk_type) = match rest {
      [l0, l1, l2, l3, t0, t1, t2, t3, ..] => {
        (u32::from_be_bytes([*l0, *l1, *l2, *l3]), ChunkType([*t0, *t1, *t2, *t3]))
      }
      _ => return Err(truncated),
    };
    if declared_len > MAX_CHUNK_LEN {
      return Err(PngError::Format { offset, reason: "chunk length exceeds 2^31-1" });
    }
    let data_end = 8_usize.checked_add(declared_len as usize).ok_or(truncated.clone())?;
    let crc_end = data_end.checked_add(4).ok_or(truncated.clone())?;
    if rest.len() < crc_end {
      return Err(truncated);
    }
    let data = &rest[8..data_end];
    let declared_crc = u32::from_be_bytes([
      rest[data_end],
      rest[data_end + 1],
      rest[data_end + 2],
      rest[data_end + 3],
    ]);
    let chunk = RawChunk { offset, chunk_type, data, declared_len, declared_crc };
    chunk.verify()?;
    if chunk_type == ChunkType::IEND && !data.is_empty() {
      return Err(PngError::Format { offset, reason: "IEND chunk must be empty" });
    }
    self.pos = offset + crc_end;
    Ok(chunk)
  }
}
impl<'b> Iterator for RawChunkIter<'b> {
  type Item = PngResult<RawChunk<'b>>;
  fn next(&mut self) -> Option<Self::Item> {
    if self.finished {
      return None;
    }
    let out = self.read_chunk();
    match &out {
      Ok(chunk) if chunk.chunk_type != ChunkType::IEND => (),
      _ => self.finished = true,
    }
    Some(out)
  }
}

/// Where each chunk type was seen, in stream order.
///
/// An ordered multimap so that chunk types allowed to repeat (`IDAT`, `tEXt`,
/// ...) keep every offset.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChunkIndex {
  seen: BTreeMap<ChunkType, Vec<usize>>,
}
impl ChunkIndex {
  #[inline]
  #[must_use]
  pub const fn new() -> Self {
    Self { seen: BTreeMap::new() }
  }

  /// Records that a chunk of this type starts at `offset`.
  pub fn record(&mut self, chunk_type: ChunkType, offset: usize) {
    self.seen.entry(chunk_type).or_default().push(offset);
  }

  /// All offsets for a chunk type, empty if it never appeared.
  #[inline]
  #[must_use]
  pub fn offsets(&self, chunk_type: ChunkType) -> &[usize] {
    self.seen.get(&chunk_type).map(Vec::as_slice).unwrap_or(&[])
  }

  /// The offset of the first chunk of this type.
  #[inline]
  #[must_use]
  pub fn first(&self, chunk_type: ChunkType) -> Option<usize> {
    self.offsets(chunk_type).first().copied()
  }

  #[inline]
  #[must_use]
  pub fn contains(&self, chunk_type: ChunkType) -> bool {
    self.seen.contains_key(&chunk_type)
  }

  /// Number of distinct chunk types seen.
  #[inline]
  #[must_use]
  pub fn len(&self) -> usize {
    self.seen.len()
  }

  #[inline]
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.seen.is_empty()
  }

  /// Iterates the chunk types (sorted by tag) with their offsets.
  pub fn iter(&self) -> impl Iterator<Item = (ChunkType, &[usize])> + '_ {
    self.seen.iter().map(|(ty, offsets)| (*ty, offsets.as_slice()))
  }
}
