//! Settings for the encode direction of the pipeline.

use crate::filter::{choose_min_sum, FilterType};

/// How the encode direction picks each row's filter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterStrategy {
  /// Every row uses the same filter type.
  Fixed(FilterType),
  /// Each row uses whichever filter type gives the smallest sum of absolute
  /// (signed) output bytes.
  MinSum,
}
impl Default for FilterStrategy {
  #[inline]
  fn default() -> Self {
    Self::MinSum
  }
}
impl FilterStrategy {
  /// Picks a filter type for `row`, with `prev` empty on the first row.
  #[inline]
  #[must_use]
  pub fn choose(self, bytes_per_pixel: usize, prev: &[u8], row: &[u8]) -> FilterType {
    match self {
      Self::Fixed(filter_type) => filter_type,
      Self::MinSum => choose_min_sum(bytes_per_pixel, prev, row),
    }
  }
}

/// Options for a [`Transcoder`](crate::Transcoder).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TranscodeConfig {
  /// DEFLATE level, 0 (store) through 10. Higher values are clamped.
  pub compression_level: u8,
  /// Used for rows that have no recorded filter type.
  pub filter_strategy: FilterStrategy,
  /// Re-use the filter types read while unfiltering when filtering again, so
  /// that decoding then encoding gives back the same filtered bytes.
  pub preserve_filters: bool,
  /// Largest `IDAT` payload written out by
  /// [`to_png_bytes`](crate::Transcoder::to_png_bytes).
  pub max_chunk_len: u32,
}
impl Default for TranscodeConfig {
  #[inline]
  fn default() -> Self {
    Self {
      compression_level: 6,
      filter_strategy: FilterStrategy::default(),
      preserve_filters: true,
      max_chunk_len: 8 * 1024,
    }
  }
}
