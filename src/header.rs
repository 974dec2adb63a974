//! The metadata chunk (`IHDR`) and the pixel format rules it has to follow.

use crate::{
  error::HeaderIssue,
  interlace::{InterlaceMethod, SubImage},
  PngError, PngResult,
};

/// Bits per channel (or per palette index).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
#[allow(missing_docs)]
pub enum BitDepth {
  One = 1,
  Two = 2,
  Four = 4,
  Eight = 8,
  Sixteen = 16,
}
impl BitDepth {
  #[inline]
  #[must_use]
  pub const fn bits(self) -> u8 {
    self as u8
  }
}
impl TryFrom<u8> for BitDepth {
  type Error = u8;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      1 => Self::One,
      2 => Self::Two,
      4 => Self::Four,
      8 => Self::Eight,
      16 => Self::Sixteen,
      _ => return Err(value),
    })
  }
}

/// The types of color that PNG supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ColorType {
  /// Greyscale
  Grayscale = 0,
  /// Red, Green, Blue
  Truecolor = 2,
  /// Index into a palette.
  Indexed = 3,
  /// Greyscale + Alpha
  GrayscaleAlpha = 4,
  /// Red, Green, Blue, Alpha
  TruecolorAlpha = 6,
}
impl ColorType {
  /// The number of channels in this type of color.
  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    match self {
      Self::Grayscale => 1,
      Self::Truecolor => 3,
      Self::Indexed => 1,
      Self::GrayscaleAlpha => 2,
      Self::TruecolorAlpha => 4,
    }
  }

  /// The bit depths this color type may be paired with.
  #[inline]
  #[must_use]
  pub const fn allowed_bit_depths(self) -> &'static [u8] {
    match self {
      Self::Grayscale => &[1, 2, 4, 8, 16],
      Self::Indexed => &[1, 2, 4, 8],
      Self::Truecolor | Self::GrayscaleAlpha | Self::TruecolorAlpha => &[8, 16],
    }
  }
}
impl TryFrom<u8> for ColorType {
  type Error = u8;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Ok(match value {
      0 => Self::Grayscale,
      2 => Self::Truecolor,
      3 => Self::Indexed,
      4 => Self::GrayscaleAlpha,
      6 => Self::TruecolorAlpha,
      _ => return Err(value),
    })
  }
}

/// A bit depth and color type pair that's known to be legal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PixelFormat {
  bit_depth: BitDepth,
  color_type: ColorType,
}
impl PixelFormat {
  /// Builds the pair, checking it against the legality table.
  pub fn new(bit_depth: BitDepth, color_type: ColorType) -> PngResult<Self> {
    validate(bit_depth.bits(), color_type as u8)
  }

  #[inline]
  #[must_use]
  pub const fn bit_depth(self) -> BitDepth {
    self.bit_depth
  }

  #[inline]
  #[must_use]
  pub const fn color_type(self) -> ColorType {
    self.color_type
  }

  #[inline]
  #[must_use]
  pub const fn channel_count(self) -> usize {
    self.color_type.channel_count()
  }

  /// Bits used by a single pixel: 1 through 64.
  #[inline]
  #[must_use]
  pub const fn bits_per_pixel(self) -> usize {
    self.channel_count() * (self.bit_depth as usize)
  }

  /// Bytes spanned by one pixel, rounded up.
  ///
  /// This is the neighbor stride for filtering. Sub-byte pixels use 1.
  #[inline]
  #[must_use]
  pub const fn bytes_per_pixel(self) -> usize {
    (self.bits_per_pixel() + 7) / 8
  }

  /// Bytes in one row of `width` pixels, not counting the filter type byte.
  ///
  /// When pixels are less than 8 bits it's possible to end up with a partial
  /// byte on the end, so we round up. `None` if it doesn't fit in a `usize`.
  #[inline]
  #[must_use]
  pub fn bytes_per_row(self, width: u32) -> Option<usize> {
    let bits = self.bits_per_pixel().checked_mul(width as usize)?;
    Some(bits / 8 + usize::from(bits % 8 != 0))
  }

  /// Bytes for `height` unfiltered rows of `width` pixels.
  #[inline]
  #[must_use]
  pub fn image_len(self, width: u32, height: u32) -> Option<usize> {
    self.bytes_per_row(width)?.checked_mul(height as usize)
  }

  /// Bytes for a whole filtered image: each row gets a filter type byte.
  ///
  /// An image with no pixels has no rows at all, so this is 0.
  #[inline]
  #[must_use]
  pub fn filtered_len(self, width: u32, height: u32) -> Option<usize> {
    if width == 0 || height == 0 {
      Some(0)
    } else {
      self.bytes_per_row(width)?.checked_add(1)?.checked_mul(height as usize)
    }
  }
}

/// Checks a bit depth and color type pair against the format's rules.
///
/// | color type | allowed bit depths |
/// |:-|:-|
/// | grayscale (0) | 1, 2, 4, 8, 16 |
/// | truecolor (2) | 8, 16 |
/// | indexed (3) | 1, 2, 4, 8 |
/// | grayscale + alpha (4) | 8, 16 |
/// | truecolor + alpha (6) | 8, 16 |
pub fn validate(bit_depth: u8, color_type: u8) -> PngResult<PixelFormat> {
  let illegal = HeaderIssue::IllegalPixelFormat { bit_depth, color_type };
  let color_type_ = ColorType::try_from(color_type).map_err(|_| illegal)?;
  if !color_type_.allowed_bit_depths().contains(&bit_depth) {
    return Err(illegal.into());
  }
  let bit_depth = BitDepth::try_from(bit_depth).map_err(|_| illegal)?;
  Ok(PixelFormat { bit_depth, color_type: color_type_ })
}

/// The one compression method the format defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompressionMethod {
  /// zlib-wrapped DEFLATE (method 0).
  #[default]
  Deflate,
}
impl CompressionMethod {
  #[inline]
  #[must_use]
  pub const fn id(self) -> u8 {
    match self {
      Self::Deflate => 0,
    }
  }
}
impl TryFrom<u8> for CompressionMethod {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Self::Deflate),
      _ => Err(HeaderIssue::CompressionMethod(value).into()),
    }
  }
}

/// The one filter method the format defines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMethod {
  /// Five per-row filter types (method 0).
  #[default]
  Adaptive,
}
impl FilterMethod {
  #[inline]
  #[must_use]
  pub const fn id(self) -> u8 {
    match self {
      Self::Adaptive => 0,
    }
  }
}
impl TryFrom<u8> for FilterMethod {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    match value {
      0 => Ok(Self::Adaptive),
      _ => Err(HeaderIssue::FilterMethod(value).into()),
    }
  }
}

/// Image Header
///
/// Set once from the first metadata chunk and never changed afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ImageMetadata {
  /// width in pixels
  pub width: u32,
  /// height in pixels
  pub height: u32,
  pub bit_depth: BitDepth,
  pub color_type: ColorType,
  pub compression_method: CompressionMethod,
  pub filter_method: FilterMethod,
  pub interlace_method: InterlaceMethod,
}
impl ImageMetadata {
  /// Length of the metadata chunk's payload.
  pub const CHUNK_LEN: usize = 13;

  /// Metadata for a new image, checking dimensions and pixel format.
  pub fn new(
    width: u32, height: u32, bit_depth: BitDepth, color_type: ColorType,
    interlace_method: InterlaceMethod,
  ) -> PngResult<Self> {
    check_dimensions(width, height)?;
    PixelFormat::new(bit_depth, color_type)?;
    let out = Self {
      width,
      height,
      bit_depth,
      color_type,
      compression_method: CompressionMethod::Deflate,
      filter_method: FilterMethod::Adaptive,
      interlace_method,
    };
    out.check_sizes()?;
    Ok(out)
  }

  /// Parses and validates a metadata chunk payload.
  pub fn from_chunk_data(data: &[u8]) -> PngResult<Self> {
    match *data {
      [w0, w1, w2, w3, h0, h1, h2, h3, bit_depth, color_type, compression, filter, interlace] => {
        let width = u32::from_be_bytes([w0, w1, w2, w3]);
        let height = u32::from_be_bytes([h0, h1, h2, h3]);
        check_dimensions(width, height)?;
        let format = validate(bit_depth, color_type)?;
        let out = Self {
          width,
          height,
          bit_depth: format.bit_depth,
          color_type: format.color_type,
          compression_method: CompressionMethod::try_from(compression)?,
          filter_method: FilterMethod::try_from(filter)?,
          interlace_method: InterlaceMethod::try_from(interlace)?,
        };
        out.check_sizes()?;
        Ok(out)
      }
      _ => Err(HeaderIssue::WrongLength(data.len()).into()),
    }
  }

  /// The 13 byte payload for writing this out as a metadata chunk.
  #[must_use]
  pub fn to_chunk_data(&self) -> [u8; 13] {
    let mut out = [0_u8; 13];
    out[0..4].copy_from_slice(&self.width.to_be_bytes());
    out[4..8].copy_from_slice(&self.height.to_be_bytes());
    out[8] = self.bit_depth.bits();
    out[9] = self.color_type as u8;
    out[10] = self.compression_method.id();
    out[11] = self.filter_method.id();
    out[12] = self.interlace_method.id();
    out
  }

  /// The validated pixel format.
  #[inline]
  #[must_use]
  pub const fn pixel_format(&self) -> PixelFormat {
    PixelFormat { bit_depth: self.bit_depth, color_type: self.color_type }
  }

  /// The sub-images the stored data is divided into: one for a plain image,
  /// seven (some possibly empty) for an Adam7 image.
  #[inline]
  pub fn sub_images(&self) -> impl Iterator<Item = SubImage> {
    self.interlace_method.sub_images(self.width, self.height)
  }

  /// Size of the decompressed (filtered) data: every non-empty sub-image's
  /// rows, each with a leading filter type byte.
  pub fn filtered_len(&self) -> PngResult<usize> {
    let format = self.pixel_format();
    self
      .sub_images()
      .try_fold(0_usize, |sum, s| sum.checked_add(format.filtered_len(s.width, s.height)?))
      .ok_or_else(|| self.too_large())
  }

  /// Size of the full raster of unfiltered pixels, rows padded to whole bytes.
  pub fn raw_len(&self) -> PngResult<usize> {
    self.pixel_format().image_len(self.width, self.height).ok_or_else(|| self.too_large())
  }

  pub(crate) fn too_large(&self) -> PngError {
    HeaderIssue::TooLarge { width: self.width, height: self.height }.into()
  }

  /// Both buffer sizes have to be something an allocation could hold.
  fn check_sizes(&self) -> PngResult<()> {
    let limit = isize::MAX as usize;
    if self.filtered_len()? > limit || self.raw_len()? > limit {
      return Err(self.too_large());
    }
    Ok(())
  }
}

fn check_dimensions(width: u32, height: u32) -> PngResult<()> {
  let limit = i32::MAX as u32;
  if width == 0 || height == 0 || width > limit || height > limit {
    Err(HeaderIssue::BadDimensions { width, height }.into())
  } else {
    Ok(())
  }
}
