//! The four stage pipeline and the buffer that moves through it.

use alloc::vec::Vec;
use core::fmt::Display;

use log::{debug, warn};

use crate::{
  chunk::ChunkIndex,
  config::TranscodeConfig,
  filter::{filter_image, unfilter_image, FilterType},
  header::ImageMetadata,
  interlace::SubImage,
  parser::parse_stream,
  writer::write_png,
  InterlaceIssue, PngError, PngResult,
};

/// Where a [`PixelBuffer`]'s bytes are in the pipeline.
///
/// * `Compressed`: the zlib stream, exactly as the `IDAT` chunks carried it.
/// * `Interlaced`: the decompressed stream. Each sub-image's filtered
///   scanlines, one sub-image after the other in pass order.
/// * `Filtered`: the same bytes, now known to be laid out as whole sub-images
///   of whole scanlines. For an Adam7 image the sub-images are still separate
///   here: each one is unfiltered on its own and the pixels are deinterlaced
///   as part of the step to `Raw` (and interlaced again on the way back).
/// * `Raw`: the full raster, top to bottom, each row padded to a whole byte.
///
/// The stages are totally ordered: `Compressed < Interlaced < Filtered < Raw`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
  Compressed = 0,
  Interlaced = 1,
  Filtered = 2,
  Raw = 3,
}
impl Stage {
  /// All stages, in order.
  pub const ALL: [Self; 4] = [Self::Compressed, Self::Interlaced, Self::Filtered, Self::Raw];

  /// The adjacent stage one step closer to `target` (or `self` if they're
  /// the same).
  #[inline]
  #[must_use]
  pub const fn step_toward(self, target: Self) -> Self {
    let here = self as usize;
    let there = target as usize;
    if there > here {
      Self::ALL[here + 1]
    } else if there < here {
      Self::ALL[here - 1]
    } else {
      self
    }
  }
}
impl TryFrom<u8> for Stage {
  type Error = PngError;
  #[inline]
  fn try_from(value: u8) -> Result<Self, Self::Error> {
    Self::ALL.get(usize::from(value)).copied().ok_or(PngError::InvalidTarget(value))
  }
}
impl Display for Stage {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.write_str(match self {
      Self::Compressed => "compressed",
      Self::Interlaced => "interlaced",
      Self::Filtered => "filtered",
      Self::Raw => "raw",
    })
  }
}

/// Some bytes, and the stage that gives them meaning.
///
/// The two only ever change together.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PixelBuffer {
  stage: Stage,
  data: Vec<u8>,
}
impl core::fmt::Debug for PixelBuffer {
  fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
    f.debug_struct("PixelBuffer")
      .field("stage", &self.stage)
      .field("len", &self.data.len())
      .finish()
  }
}
impl PixelBuffer {
  #[inline]
  #[must_use]
  pub const fn stage(&self) -> Stage {
    self.stage
  }
  #[inline]
  #[must_use]
  pub fn data(&self) -> &[u8] {
    &self.data
  }
  #[inline]
  #[must_use]
  pub fn into_data(self) -> Vec<u8> {
    self.data
  }
}

/// Owns one image's metadata and pixel buffer, and moves the buffer between
/// stages.
///
/// ```
/// use pngstage::{Stage, Transcoder};
/// # fn demo(png: &[u8]) -> pngstage::PngResult<()> {
/// let mut t = Transcoder::from_png_bytes(png)?;
/// t.transcode(Stage::Raw)?;
/// let pixels: &[u8] = t.data();
/// # let _ = pixels;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Transcoder {
  metadata: ImageMetadata,
  buffer: PixelBuffer,
  chunks: ChunkIndex,
  /// One filter type per scanline (all sub-images, in order), as last read
  /// while unfiltering.
  filter_plan: Vec<FilterType>,
  /// The zlib stream the current data was decompressed from.
  source_zlib: Option<Vec<u8>>,
  config: TranscodeConfig,
}
impl Transcoder {
  /// Parses a PNG stream with the default config. The buffer starts out
  /// `Compressed`.
  #[inline]
  pub fn from_png_bytes(bytes: &[u8]) -> PngResult<Self> {
    Self::with_config(bytes, TranscodeConfig::default())
  }

  /// Parses a PNG stream. The buffer starts out `Compressed`.
  pub fn with_config(bytes: &[u8], config: TranscodeConfig) -> PngResult<Self> {
    let parsed = parse_stream(bytes)?;
    Ok(Self {
      metadata: parsed.metadata,
      buffer: PixelBuffer { stage: Stage::Compressed, data: parsed.payload },
      chunks: parsed.chunks,
      filter_plan: Vec::new(),
      source_zlib: None,
      config,
    })
  }

  /// Starts from a full raster of pixels, for going toward `Compressed`.
  ///
  /// `pixels` must be exactly [`raw_len`](ImageMetadata::raw_len) bytes.
  pub fn from_raw_pixels(
    metadata: ImageMetadata, pixels: Vec<u8>, config: TranscodeConfig,
  ) -> PngResult<Self> {
    let expected = metadata.raw_len()?;
    if pixels.len() != expected {
      return Err(InterlaceIssue::LengthMismatch { expected, actual: pixels.len() }.into());
    }
    Ok(Self {
      metadata,
      buffer: PixelBuffer { stage: Stage::Raw, data: pixels },
      chunks: ChunkIndex::new(),
      filter_plan: Vec::new(),
      source_zlib: None,
      config,
    })
  }

  #[inline]
  #[must_use]
  pub const fn metadata(&self) -> &ImageMetadata {
    &self.metadata
  }
  #[inline]
  #[must_use]
  pub const fn stage(&self) -> Stage {
    self.buffer.stage
  }
  #[inline]
  #[must_use]
  pub const fn buffer(&self) -> &PixelBuffer {
    &self.buffer
  }
  /// The buffer's bytes, meaningful according to [`stage`](Self::stage).
  #[inline]
  #[must_use]
  pub fn data(&self) -> &[u8] {
    &self.buffer.data
  }
  /// Chunks seen while parsing (empty when built from pixels).
  #[inline]
  #[must_use]
  pub const fn chunk_index(&self) -> &ChunkIndex {
    &self.chunks
  }
  #[inline]
  #[must_use]
  pub fn filter_plan(&self) -> &[FilterType] {
    &self.filter_plan
  }
  #[inline]
  #[must_use]
  pub const fn config(&self) -> &TranscodeConfig {
    &self.config
  }
  #[inline]
  pub fn config_mut(&mut self) -> &mut TranscodeConfig {
    &mut self.config
  }
  #[inline]
  #[must_use]
  pub fn into_buffer(self) -> PixelBuffer {
    self.buffer
  }

  /// Moves the buffer to `target`, one adjacent stage at a time.
  ///
  /// If a step fails the error is returned and the buffer stays at the last
  /// stage that was fully reached.
  ///
  /// Going back to `Compressed` re-uses the zlib stream the data was
  /// decompressed from if the data hasn't changed since. Otherwise the data
  /// is compressed at the configured level.
  pub fn transcode(&mut self, target: Stage) -> PngResult<()> {
    while self.buffer.stage != target {
      let from = self.buffer.stage;
      let to = from.step_toward(target);
      if let Err(e) = self.step(from, to) {
        warn!("{from} -> {to} failed: {e}");
        return Err(e);
      }
      debug!("{from} -> {to}: {} bytes", self.buffer.data.len());
    }
    Ok(())
  }

  /// As [`transcode`](Self::transcode), with the stage given by number.
  #[inline]
  pub fn transcode_to_id(&mut self, target: u8) -> PngResult<()> {
    self.transcode(Stage::try_from(target)?)
  }

  /// Transcodes to `Compressed` and writes out a complete PNG stream.
  pub fn to_png_bytes(&mut self) -> PngResult<Vec<u8>> {
    self.transcode(Stage::Compressed)?;
    Ok(write_png(&self.metadata, &self.buffer.data, self.config.max_chunk_len))
  }

  fn commit(&mut self, stage: Stage, data: Vec<u8>) {
    self.buffer = PixelBuffer { stage, data };
  }

  fn step(&mut self, from: Stage, to: Stage) -> PngResult<()> {
    use Stage::*;
    let method = self.metadata.compression_method;
    match (from, to) {
      (Compressed, Interlaced) => {
        let data = method.decompress(&self.buffer.data, self.metadata.filtered_len()?)?;
        let source = core::mem::take(&mut self.buffer.data);
        self.commit(to, data);
        self.source_zlib = Some(source);
      }
      (Interlaced, Filtered) | (Filtered, Interlaced) => {
        self.split_sub_images()?;
        self.buffer.stage = to;
      }
      (Filtered, Raw) => {
        let data = self.unfilter()?;
        self.commit(to, data);
      }
      (Raw, Filtered) => {
        let data = self.filter()?;
        self.commit(to, data);
      }
      (Interlaced, Compressed) => {
        let data = match self.source_zlib.take() {
          Some(source) if self.decompresses_to_current(&source) => {
            debug!("data unchanged, re-using the source zlib stream");
            source
          }
          source => {
            self.source_zlib = source;
            method.compress(&self.buffer.data, self.config.compression_level)?
          }
        };
        self.commit(to, data);
        self.source_zlib = None;
      }
      _ => unreachable!("{from} -> {to} isn't a single step"),
    }
    Ok(())
  }

  fn decompresses_to_current(&self, zlib: &[u8]) -> bool {
    let current = &self.buffer.data;
    self
      .metadata
      .compression_method
      .decompress(zlib, current.len())
      .is_ok_and(|data| data == *current)
  }

  /// Cuts filtered data into its non-empty sub-images, checking that the
  /// lengths add up exactly.
  fn split_sub_images(&self) -> PngResult<Vec<(SubImage, &[u8])>> {
    let expected = self.metadata.filtered_len()?;
    let actual = self.buffer.data.len();
    if actual != expected {
      return Err(InterlaceIssue::LengthMismatch { expected, actual }.into());
    }
    let format = self.metadata.pixel_format();
    let mut rest = self.buffer.data.as_slice();
    let mut out = Vec::with_capacity(7);
    for sub in self.metadata.sub_images().filter(|s| !s.is_empty()) {
      let len =
        format.filtered_len(sub.width, sub.height).ok_or_else(|| self.metadata.too_large())?;
      let (this, more) = rest.split_at(len);
      out.push((sub, this));
      rest = more;
    }
    Ok(out)
  }

  fn unfilter(&mut self) -> PngResult<Vec<u8>> {
    let ImageMetadata { width, height, interlace_method, .. } = self.metadata;
    let format = self.metadata.pixel_format();
    let mut plan = Vec::new();
    let mut reduced = Vec::with_capacity(self.metadata.raw_len()?);
    for (sub, filtered) in self.split_sub_images()? {
      reduced.extend(unfilter_image(filtered, sub.width, sub.height, format, &mut plan)?);
    }
    let raster = interlace_method.deinterlace(&reduced, width, height, format.bits_per_pixel())?;
    self.filter_plan = plan;
    Ok(raster)
  }

  fn filter(&self) -> PngResult<Vec<u8>> {
    let ImageMetadata { width, height, interlace_method, .. } = self.metadata;
    let format = self.metadata.pixel_format();
    let bpp = format.bytes_per_pixel();
    let reduced =
      interlace_method.interlace(&self.buffer.data, width, height, format.bits_per_pixel())?;
    let total_rows: usize =
      self.metadata.sub_images().filter(|s| !s.is_empty()).map(|s| s.height as usize).sum();
    let plan = if self.config.preserve_filters && self.filter_plan.len() == total_rows {
      Some(self.filter_plan.as_slice())
    } else {
      None
    };
    let strategy = self.config.filter_strategy;
    let mut out = Vec::with_capacity(self.metadata.filtered_len()?);
    let mut rest = reduced.as_slice();
    let mut first_row = 0;
    for sub in self.metadata.sub_images().filter(|s| !s.is_empty()) {
      let len = format.image_len(sub.width, sub.height).ok_or_else(|| self.metadata.too_large())?;
      let (this, more) = rest.split_at(len);
      rest = more;
      let filtered = filter_image(this, sub.width, sub.height, format, |y, prev, row| match plan {
        Some(plan) => plan[first_row + y],
        None => strategy.choose(bpp, prev, row),
      })?;
      out.extend_from_slice(&filtered);
      first_row += sub.height as usize;
    }
    Ok(out)
  }
}
