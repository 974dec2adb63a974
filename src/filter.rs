//! Per-scanline filtering, in both directions.
//!
//! > Filters are applied to **bytes**, not to pixels, regardless of the bit
//! > depth or color type of the image.
//!
//! For the byte `x` being filtered, the neighbors are:
//! * `a`: the byte one *pixel* to the left (`bytes_per_pixel` bytes back in
//!   the same row), or 0 at the start of the row.
//! * `b`: the byte directly above in the previous row, or 0 on the first row.
//! * `c`: the byte one pixel to the left of `b`, or 0 if either is missing.
//!
//! Encoding uses the original bytes as neighbors, decoding uses the already
//! reconstructed ones, so rows have to be decoded strictly top to bottom.

use alloc::vec::Vec;

use crate::{error::FilterIssue, header::PixelFormat, PngResult};

/// The five filter types of filter method 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum FilterType {
  /// `x`
  #[default]
  None = 0,
  /// `x - a`
  Sub = 1,
  /// `x - b`
  Up = 2,
  /// `x - floor((a + b) / 2)`
  Average = 3,
  /// `x - paeth(a, b, c)`
  Paeth = 4,
}
impl FilterType {
  /// All filter types, in filter type byte order.
  pub const ALL: [Self; 5] = [Self::None, Self::Sub, Self::Up, Self::Average, Self::Paeth];

  /// Filters one byte.
  #[inline]
  #[must_use]
  pub const fn encode(self, x: u8, a: u8, b: u8, c: u8) -> u8 {
    match self {
      Self::None => x,
      Self::Sub => x.wrapping_sub(a),
      Self::Up => x.wrapping_sub(b),
      Self::Average => x.wrapping_sub(average(a, b)),
      Self::Paeth => x.wrapping_sub(paeth_predictor(a, b, c)),
    }
  }

  /// Reconstructs one byte. `a`, `b`, and `c` must already be reconstructed.
  #[inline]
  #[must_use]
  pub const fn decode(self, fx: u8, a: u8, b: u8, c: u8) -> u8 {
    match self {
      Self::None => fx,
      Self::Sub => fx.wrapping_add(a),
      Self::Up => fx.wrapping_add(b),
      Self::Average => fx.wrapping_add(average(a, b)),
      Self::Paeth => fx.wrapping_add(paeth_predictor(a, b, c)),
    }
  }
}
impl TryFrom<u8> for FilterType {
  type Error = u8;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::None,
      1 => Self::Sub,
      2 => Self::Up,
      3 => Self::Average,
      4 => Self::Paeth,
      _ => return Err(value),
    })
  }
}

#[inline]
const fn average(a: u8, b: u8) -> u8 {
  ((a as u16 + b as u16) / 2) as u8
}

/// The Paeth filter function computes a simple linear function of the three
/// neighboring bytes (left `a`, above `b`, upper left `c`), then picks
/// whichever neighbor is closest to it.
const fn paeth_predictor(a: u8, b: u8, c: u8) -> u8 {
  let a_ = a as i32;
  let b_ = b as i32;
  let c_ = c as i32;
  let p: i32 = a_ + b_ - c_;
  let pa = (p - a_).abs();
  let pb = (p - b_).abs();
  let pc = (p - c_).abs();
  // Note: the order of these tests is part of the format, ties go to `a`,
  // then `b`, then `c`.
  if pa <= pb && pa <= pc {
    a
  } else if pb <= pc {
    b
  } else {
    c
  }
}

#[inline]
fn neighbors(row: &[u8], prev: &[u8], i: usize, bpp: usize) -> (u8, u8, u8) {
  let b = prev.get(i).copied().unwrap_or(0);
  if i >= bpp {
    (row[i - bpp], b, prev.get(i - bpp).copied().unwrap_or(0))
  } else {
    (0, b, 0)
  }
}

/// Where one scanline lives and how it was filtered.
///
/// Derived while walking filtered data, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ScanlineDescriptor {
  /// Offset of the row's filter type byte.
  pub offset: usize,
  pub pixel_count: u32,
  pub bytes_per_pixel: usize,
  pub filter_type: FilterType,
}

/// Walks the scanlines of one filtered (sub-)image.
///
/// Fails up front if `width` is 0 or the data isn't exactly `height` rows;
/// each row then fails on its own if its filter type byte is unknown.
pub fn scanlines(
  filtered: &[u8], width: u32, height: u32, format: PixelFormat,
) -> PngResult<impl Iterator<Item = PngResult<ScanlineDescriptor>> + '_> {
  if width == 0 {
    return Err(FilterIssue::ZeroWidth.into());
  }
  let too_large = FilterIssue::TooLarge { width, height };
  let expected = format.filtered_len(width, height).ok_or(too_large)?;
  if filtered.len() != expected {
    return Err(FilterIssue::LengthMismatch { expected, actual: filtered.len() }.into());
  }
  // can't overflow, it's at most `expected`
  let line_len = 1 + format.bytes_per_row(width).ok_or(too_large)?;
  let bytes_per_pixel = format.bytes_per_pixel();
  Ok(filtered.chunks_exact(line_len).enumerate().map(move |(row, line)| -> PngResult<_> {
    let filter_type = FilterType::try_from(line[0])
      .map_err(|byte| FilterIssue::UnknownFilterType { row, byte })?;
    Ok(ScanlineDescriptor {
      offset: row * line_len,
      pixel_count: width,
      bytes_per_pixel,
      filter_type,
    })
  }))
}

/// Filters `row` against `prev` (empty for the first row), pushing the filter
/// type byte and then the filtered bytes onto `out`.
pub fn filter_row(filter_type: FilterType, bpp: usize, prev: &[u8], row: &[u8], out: &mut Vec<u8>) {
  out.push(filter_type as u8);
  match filter_type {
    FilterType::None => out.extend_from_slice(row),
    _ => out.extend((0..row.len()).map(|i| {
      let (a, b, c) = neighbors(row, prev, i, bpp);
      filter_type.encode(row[i], a, b, c)
    })),
  }
}

/// Reconstructs `row` in place, given the already reconstructed `prev` row
/// (empty for the first row).
pub fn unfilter_row(filter_type: FilterType, bpp: usize, prev: &[u8], row: &mut [u8]) {
  match filter_type {
    FilterType::None => (),
    FilterType::Sub => {
      // the first pixel has no left neighbor, so it's already correct.
      for i in bpp..row.len() {
        row[i] = row[i].wrapping_add(row[i - bpp]);
      }
    }
    FilterType::Up => {
      row.iter_mut().zip(prev.iter().copied()).for_each(|(x, b)| *x = x.wrapping_add(b));
    }
    FilterType::Average | FilterType::Paeth => {
      for i in 0..row.len() {
        let (a, b, c) = neighbors(row, prev, i, bpp);
        row[i] = filter_type.decode(row[i], a, b, c);
      }
    }
  }
}

/// Unfilters one whole (sub-)image.
///
/// The output is just pixel rows, without filter type bytes. The filter type
/// of each row is pushed onto `plan` so it can be re-applied later.
pub fn unfilter_image(
  filtered: &[u8], width: u32, height: u32, format: PixelFormat, plan: &mut Vec<FilterType>,
) -> PngResult<Vec<u8>> {
  let lines = scanlines(filtered, width, height, format)?;
  let row_bytes =
    format.bytes_per_row(width).ok_or(FilterIssue::TooLarge { width, height })?;
  let bpp = format.bytes_per_pixel();
  let mut out: Vec<u8> = Vec::with_capacity(filtered.len() - height as usize);
  for (y, desc) in lines.enumerate() {
    let desc = desc?;
    let start = out.len();
    out.extend_from_slice(&filtered[desc.offset + 1..][..row_bytes]);
    let (done, current) = out.split_at_mut(start);
    let prev: &[u8] = if y == 0 { &[] } else { &done[start - row_bytes..] };
    unfilter_row(desc.filter_type, bpp, prev, current);
    plan.push(desc.filter_type);
  }
  Ok(out)
}

/// Filters one whole (sub-)image of pixel rows.
///
/// `choose(y, prev, row)` picks the filter type for each row; `prev` is empty
/// on the first row.
pub fn filter_image<F>(
  raw: &[u8], width: u32, height: u32, format: PixelFormat, mut choose: F,
) -> PngResult<Vec<u8>>
where
  F: FnMut(usize, &[u8], &[u8]) -> FilterType,
{
  if width == 0 {
    return Err(FilterIssue::ZeroWidth.into());
  }
  let too_large = FilterIssue::TooLarge { width, height };
  let row_bytes = format.bytes_per_row(width).ok_or(too_large)?;
  let expected = row_bytes.checked_mul(height as usize).ok_or(too_large)?;
  if raw.len() != expected {
    return Err(FilterIssue::LengthMismatch { expected, actual: raw.len() }.into());
  }
  let bpp = format.bytes_per_pixel();
  let mut out = Vec::with_capacity(raw.len().saturating_add(height as usize));
  let mut prev: &[u8] = &[];
  for (y, row) in raw.chunks_exact(row_bytes).enumerate() {
    let filter_type = choose(y, prev, row);
    filter_row(filter_type, bpp, prev, row, &mut out);
    prev = row;
  }
  Ok(out)
}

/// Picks the filter type whose output has the smallest sum of absolute values
/// (treating each output byte as signed). Ties go to the lower filter type.
#[must_use]
pub fn choose_min_sum(bpp: usize, prev: &[u8], row: &[u8]) -> FilterType {
  let mut best = (FilterType::None, u64::MAX);
  for filter_type in FilterType::ALL {
    let score: u64 = (0..row.len())
      .map(|i| {
        let (a, b, c) = neighbors(row, prev, i, bpp);
        u64::from((filter_type.encode(row[i], a, b, c) as i8).unsigned_abs())
      })
      .sum();
    if score < best.1 {
      best = (filter_type, score);
    }
  }
  best.0
}
