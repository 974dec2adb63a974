use alloc::string::String;

use thiserror::Error;

use crate::chunk::ChunkType;

/// Shorthand for results from this crate.
pub type PngResult<T> = Result<T, PngError>;

/// An error from the `pngstage` crate.
///
/// None of these are retried internally. Whatever operation raised one has
/// stopped, and any [`Transcoder`](crate::Transcoder) involved is still at the
/// last stage it fully reached.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum PngError {
  /// Bad signature, truncated record, or a missing terminal chunk.
  #[error("malformed stream at byte {offset}: {reason}")]
  Format { offset: usize, reason: &'static str },

  /// A chunk's stored CRC doesn't match its type and payload.
  #[error("crc mismatch in {chunk} chunk at byte {offset}: declared {declared:#010x}, actual {actual:#010x}")]
  Integrity { chunk: ChunkType, offset: usize, declared: u32, actual: u32 },

  /// Chunks were seen in an order the format doesn't allow.
  #[error("{chunk} chunk at byte {offset} is out of sequence: {reason}")]
  Sequence { chunk: ChunkType, offset: usize, reason: &'static str },

  /// The metadata chunk describes something we can't (or mustn't) decode.
  #[error("invalid header: {0}")]
  InvalidHeader(HeaderIssue),

  /// A scanline couldn't be filtered or unfiltered.
  #[error("filter error: {0}")]
  Filter(FilterIssue),

  /// The interlace geometry doesn't line up with the bytes given.
  #[error("interlace error: {0}")]
  Interlace(InterlaceIssue),

  /// The underlying DEFLATE codec failed.
  #[error("compression error: {0}")]
  Compression(String),

  /// A transcode target that isn't one of the four stages.
  #[error("invalid transcode target {0}, stages are 0 through 3")]
  InvalidTarget(u8),
}

/// The fieldless "category" of a [`PngError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum ErrorKind {
  Format,
  Integrity,
  Sequence,
  InvalidHeader,
  Filter,
  Interlace,
  Compression,
  InvalidTarget,
}

impl PngError {
  /// Which category of error this is.
  #[inline]
  #[must_use]
  pub const fn kind(&self) -> ErrorKind {
    match self {
      Self::Format { .. } => ErrorKind::Format,
      Self::Integrity { .. } => ErrorKind::Integrity,
      Self::Sequence { .. } => ErrorKind::Sequence,
      Self::InvalidHeader(_) => ErrorKind::InvalidHeader,
      Self::Filter(_) => ErrorKind::Filter,
      Self::Interlace(_) => ErrorKind::Interlace,
      Self::Compression(_) => ErrorKind::Compression,
      Self::InvalidTarget(_) => ErrorKind::InvalidTarget,
    }
  }
}

/// Details for [`PngError::InvalidHeader`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HeaderIssue {
  #[error("metadata chunk must be 13 bytes, got {0}")]
  WrongLength(usize),
  #[error("width and height must be 1 ..= 2^31-1, got {width}x{height}")]
  BadDimensions { width: u32, height: u32 },
  #[error("a {width}x{height} image is too large to hold in memory")]
  TooLarge { width: u32, height: u32 },
  #[error("bit depth {bit_depth} is not allowed with color type {color_type}")]
  IllegalPixelFormat { bit_depth: u8, color_type: u8 },
  #[error("unsupported compression method {0}")]
  CompressionMethod(u8),
  #[error("unsupported filter method {0}")]
  FilterMethod(u8),
  #[error("unsupported interlace method {0}")]
  InterlaceMethod(u8),
}

/// Details for [`PngError::Filter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FilterIssue {
  #[error("filter type byte {byte} on row {row} is not 0 through 4")]
  UnknownFilterType { row: usize, byte: u8 },
  #[error("image width is zero")]
  ZeroWidth,
  #[error("a {width}x{height} image is too large to hold in memory")]
  TooLarge { width: u32, height: u32 },
  #[error("expected {expected} bytes of scanline data, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

/// Details for [`PngError::Interlace`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum InterlaceIssue {
  #[error("image width or height is zero")]
  ZeroDimension,
  #[error("a {width}x{height} image is too large to hold in memory")]
  TooLarge { width: u32, height: u32 },
  #[error("expected {expected} bytes for the image geometry, got {actual}")]
  LengthMismatch { expected: usize, actual: usize },
}

impl From<HeaderIssue> for PngError {
  #[inline]
  fn from(issue: HeaderIssue) -> Self {
    Self::InvalidHeader(issue)
  }
}
impl From<FilterIssue> for PngError {
  #[inline]
  fn from(issue: FilterIssue) -> Self {
    Self::Filter(issue)
  }
}
impl From<InterlaceIssue> for PngError {
  #[inline]
  fn from(issue: InterlaceIssue) -> Self {
    Self::Interlace(issue)
  }
}
