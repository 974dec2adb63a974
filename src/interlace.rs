//! Adam7 interlacing: splitting a raster into 7 reduced images and back.
//!
//! ```text
//! 1 6 4 6 2 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! 3 6 4 6 3 6 4 6
//! 7 7 7 7 7 7 7 7
//! 5 6 5 6 5 6 5 6
//! 7 7 7 7 7 7 7 7
//! ```
//!
//! Everything here works in *bits* per pixel so that 1, 2, and 4 bit images
//! split correctly. Rows of both the full raster and of every reduced image
//! are padded out to a whole number of bytes, same as in the stored data.

use alloc::{vec, vec::Vec};

use crate::{
  error::{HeaderIssue, InterlaceIssue},
  PngError, PngResult,
};

/// Where one Adam7 pass starts and how far apart its pixels are.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Adam7Pass {
  pub x_start: u32,
  pub y_start: u32,
  pub x_step: u32,
  pub y_step: u32,
}
impl Adam7Pass {
  const fn new(x_start: u32, y_start: u32, x_step: u32, y_step: u32) -> Self {
    Self { x_start, y_start, x_step, y_step }
  }

  /// The reduced image size this pass gives for a full image size.
  #[inline]
  #[must_use]
  pub const fn dimensions(self, full_width: u32, full_height: u32) -> (u32, u32) {
    (extent(full_width, self.x_start, self.x_step), extent(full_height, self.y_start, self.y_step))
  }
}

/// Passes 1 through 7, in the order their data is stored.
pub const ADAM7_PASSES: [Adam7Pass; 7] = [
  Adam7Pass::new(0, 0, 8, 8),
  Adam7Pass::new(4, 0, 8, 8),
  Adam7Pass::new(0, 4, 4, 8),
  Adam7Pass::new(2, 0, 4, 4),
  Adam7Pass::new(0, 2, 2, 4),
  Adam7Pass::new(1, 0, 2, 2),
  Adam7Pass::new(0, 1, 1, 2),
];

#[inline]
const fn extent(full: u32, start: u32, step: u32) -> u32 {
  if full > start {
    (full - start + step - 1) / step
  } else {
    0
  }
}

/// Given the dimensions of the full image, computes the size of each reduced
/// image. Some of them can be 0 wide or 0 high when the image is small.
#[inline]
#[must_use]
pub const fn adam7_sub_image_dimensions(full_width: u32, full_height: u32) -> [(u32, u32); 7] {
  let mut out = [(0, 0); 7];
  let mut i = 0;
  while i < 7 {
    out[i] = ADAM7_PASSES[i].dimensions(full_width, full_height);
    i += 1;
  }
  out
}

/// One independently filtered image within the stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubImage {
  /// 0 for a non-interlaced image, otherwise the Adam7 pass (1 through 7).
  pub pass: u8,
  pub width: u32,
  pub height: u32,
}
impl SubImage {
  /// If there are no pixels here the sub-image has no scanlines at all.
  #[inline]
  #[must_use]
  pub const fn is_empty(self) -> bool {
    self.width == 0 || self.height == 0
  }
}

/// How the stored data is laid out spatially.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InterlaceMethod {
  /// Rows top to bottom (method 0).
  #[default]
  None,
  /// Seven reduced images (method 1).
  Adam7,
}
impl InterlaceMethod {
  #[inline]
  #[must_use]
  pub const fn id(self) -> u8 {
    match self {
      Self::None => 0,
      Self::Adam7 => 1,
    }
  }

  /// The sub-images for a full image of the given size, in storage order.
  pub fn sub_images(self, width: u32, height: u32) -> impl Iterator<Item = SubImage> {
    let mut out = [SubImage { pass: 0, width, height }; 7];
    let count = match self {
      Self::None => 1,
      Self::Adam7 => {
        for (i, (sub, (w, h))) in
          out.iter_mut().zip(adam7_sub_image_dimensions(width, height)).enumerate()
        {
          *sub = SubImage { pass: (i + 1) as u8, width: w, height: h };
        }
        7
      }
    };
    out.into_iter().take(count)
  }

  /// Reorders a full raster into storage order (identity for `None`).
  pub fn interlace(
    self, raster: &[u8], width: u32, height: u32, bits_per_pixel: usize,
  ) -> PngResult<Vec<u8>> {
    match self {
      Self::None => {
        check_raster(raster.len(), width, height, bits_per_pixel)?;
        Ok(raster.to_vec())
      }
      Self::Adam7 => interlace(raster, width, height, bits_per_pixel),
    }
  }

  /// Restores a full raster from storage order (identity for `None`).
  pub fn deinterlace(
    self, sub_images: &[u8], width: u32, height: u32, bits_per_pixel: usize,
  ) -> PngResult<Vec<u8>> {
    match self {
      Self::None => {
        check_raster(sub_images.len(), width, height, bits_per_pixel)?;
        Ok(sub_images.to_vec())
      }
      Self::Adam7 => deinterlace(sub_images, width, height, bits_per_pixel),
    }
  }
}
impl TryFrom<u8> for InterlaceMethod {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Self::None),
      1 => Ok(Self::Adam7),
      _ => Err(HeaderIssue::InterlaceMethod(value).into()),
    }
  }
}

#[inline]
fn row_bytes(width: u32, bits_per_pixel: usize) -> Option<usize> {
  let bits = (width as usize).checked_mul(bits_per_pixel)?;
  Some(bits / 8 + usize::from(bits % 8 != 0))
}

/// Row bytes and total bytes of a `width` by `height` raster.
fn raster_size(width: u32, height: u32, bits_per_pixel: usize) -> PngResult<(usize, usize)> {
  if width == 0 || height == 0 {
    return Err(InterlaceIssue::ZeroDimension.into());
  }
  let too_large = InterlaceIssue::TooLarge { width, height };
  let row = row_bytes(width, bits_per_pixel).ok_or(too_large)?;
  Ok((row, row.checked_mul(height as usize).ok_or(too_large)?))
}

fn check_raster(len: usize, width: u32, height: u32, bits_per_pixel: usize) -> PngResult<usize> {
  let (row, expected) = raster_size(width, height, bits_per_pixel)?;
  if len != expected {
    return Err(InterlaceIssue::LengthMismatch { expected, actual: len }.into());
  }
  Ok(row)
}

/// Row bytes and total bytes of each reduced image, in pass order.
fn pass_sizes(width: u32, height: u32, bits_per_pixel: usize) -> PngResult<[(usize, usize); 7]> {
  let too_large = InterlaceIssue::TooLarge { width, height };
  let mut out = [(0, 0); 7];
  for (size, (w, h)) in out.iter_mut().zip(adam7_sub_image_dimensions(width, height)) {
    let row = row_bytes(w, bits_per_pixel).ok_or(too_large)?;
    *size = (row, row.checked_mul(h as usize).ok_or(too_large)?);
  }
  Ok(out)
}

/// Total bytes of the 7 reduced images for a full image size.
pub fn adam7_len(width: u32, height: u32, bits_per_pixel: usize) -> PngResult<usize> {
  pass_sizes(width, height, bits_per_pixel)?
    .iter()
    .try_fold(0_usize, |sum, &(_, len)| sum.checked_add(len))
    .ok_or_else(|| InterlaceIssue::TooLarge { width, height }.into())
}

/// Copies one pixel between rows. Pixels under 8 bits are packed with the
/// left-most pixel in the highest bits of the byte.
#[inline]
fn copy_pixel(src: &[u8], src_x: usize, dst: &mut [u8], dst_x: usize, bits_per_pixel: usize) {
  if bits_per_pixel >= 8 {
    let n = bits_per_pixel / 8;
    dst[dst_x * n..][..n].copy_from_slice(&src[src_x * n..][..n]);
  } else {
    let mask = ((1_u16 << bits_per_pixel) - 1) as u8;
    let src_bit = src_x * bits_per_pixel;
    let src_shift = 8 - bits_per_pixel - (src_bit % 8);
    let value = (src[src_bit / 8] >> src_shift) & mask;
    let dst_bit = dst_x * bits_per_pixel;
    let dst_shift = 8 - bits_per_pixel - (dst_bit % 8);
    let byte = &mut dst[dst_bit / 8];
    *byte = (*byte & !(mask << dst_shift)) | (value << dst_shift);
  }
}

/// Packs the pixels of a full raster into the 7 Adam7 reduced images, pass by
/// pass. Empty passes contribute no bytes.
pub fn interlace(
  raster: &[u8], width: u32, height: u32, bits_per_pixel: usize,
) -> PngResult<Vec<u8>> {
  debug_assert!(matches!(bits_per_pixel, 1 | 2 | 4) || bits_per_pixel % 8 == 0);
  let full_row_bytes = check_raster(raster.len(), width, height, bits_per_pixel)?;
  let sizes = pass_sizes(width, height, bits_per_pixel)?;
  let mut out = vec![0_u8; adam7_len(width, height, bits_per_pixel)?];
  let mut rest = out.as_mut_slice();
  for (pass, (sub_row_bytes, pass_len)) in ADAM7_PASSES.into_iter().zip(sizes) {
    let (sub_w, _) = pass.dimensions(width, height);
    let (this_pass, more) = core::mem::take(&mut rest).split_at_mut(pass_len);
    rest = more;
    if sub_row_bytes == 0 {
      continue;
    }
    for (sub_y, dst_row) in this_pass.chunks_exact_mut(sub_row_bytes).enumerate() {
      let y = (pass.y_start + sub_y as u32 * pass.y_step) as usize;
      let src_row = &raster[y * full_row_bytes..][..full_row_bytes];
      for sub_x in 0..sub_w as usize {
        let x = pass.x_start as usize + sub_x * pass.x_step as usize;
        copy_pixel(src_row, x, dst_row, sub_x, bits_per_pixel);
      }
    }
  }
  Ok(out)
}

/// Scatters the 7 Adam7 reduced images back into a full raster.
///
/// The exact inverse of [`interlace`].
pub fn deinterlace(
  sub_images: &[u8], width: u32, height: u32, bits_per_pixel: usize,
) -> PngResult<Vec<u8>> {
  debug_assert!(matches!(bits_per_pixel, 1 | 2 | 4) || bits_per_pixel % 8 == 0);
  let (full_row_bytes, raster_len) = raster_size(width, height, bits_per_pixel)?;
  let expected = adam7_len(width, height, bits_per_pixel)?;
  if sub_images.len() != expected {
    return Err(InterlaceIssue::LengthMismatch { expected, actual: sub_images.len() }.into());
  }
  let sizes = pass_sizes(width, height, bits_per_pixel)?;
  let mut out = vec![0_u8; raster_len];
  let mut rest = sub_images;
  for (pass, (sub_row_bytes, pass_len)) in ADAM7_PASSES.into_iter().zip(sizes) {
    let (sub_w, _) = pass.dimensions(width, height);
    let (this_pass, more) = rest.split_at(pass_len);
    rest = more;
    if sub_row_bytes == 0 {
      continue;
    }
    for (sub_y, src_row) in this_pass.chunks_exact(sub_row_bytes).enumerate() {
      let y = (pass.y_start + sub_y as u32 * pass.y_step) as usize;
      let dst_row = &mut out[y * full_row_bytes..][..full_row_bytes];
      for sub_x in 0..sub_w as usize {
        let x = pass.x_start as usize + sub_x * pass.x_step as usize;
        copy_pixel(src_row, sub_x, dst_row, x, bits_per_pixel);
      }
    }
  }
  Ok(out)
}
