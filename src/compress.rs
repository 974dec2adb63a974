//! The boundary to the zlib/DEFLATE codec.
//!
//! This crate doesn't implement DEFLATE, it hands the bytes to `miniz_oxide`.

use alloc::{format, vec::Vec};

use miniz_oxide::{deflate::compress_to_vec_zlib, inflate::decompress_to_vec_zlib_with_limit};

use crate::{header::CompressionMethod, PngError, PngResult};

/// Highest level the codec understands.
pub const MAX_COMPRESSION_LEVEL: u8 = 10;

impl CompressionMethod {
  /// Compresses `bytes` into a complete zlib stream.
  ///
  /// `level` is clamped to `0 ..= 10`.
  pub fn compress(self, bytes: &[u8], level: u8) -> PngResult<Vec<u8>> {
    match self {
      Self::Deflate => Ok(compress_to_vec_zlib(bytes, level.min(MAX_COMPRESSION_LEVEL))),
    }
  }

  /// Decompresses a complete zlib stream.
  ///
  /// Output larger than `limit` bytes is an error rather than an allocation.
  pub fn decompress(self, bytes: &[u8], limit: usize) -> PngResult<Vec<u8>> {
    match self {
      Self::Deflate => decompress_to_vec_zlib_with_limit(bytes, limit)
        .map_err(|e| PngError::Compression(format!("zlib stream failed: {:?}", e.status))),
    }
  }
}
