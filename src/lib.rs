#![no_std]
#![forbid(unsafe_code)]

//! A PNG codec built as a pipeline of reversible stages.
//!
//! A PNG's pixels pass through four forms:
//!
//! ```text
//! Compressed <-> Interlaced <-> Filtered <-> Raw
//! ```
//!
//! A [`Transcoder`] owns the bytes of one image and moves them from stage to
//! stage in either direction, one adjacent step at a time. Start one from PNG
//! bytes ([`Transcoder::from_png_bytes`]) to decode, or from pixels
//! ([`Transcoder::from_raw_pixels`]) to encode.
//!
//! The pieces are also usable on their own:
//! * [`chunk`] and [`parser`] read the container (signature, length-prefixed
//!   CRC-checked chunks), [`writer`] writes it.
//! * [`header`] validates the `IHDR` data.
//! * [`filter`] is the scanline filter engine.
//! * [`interlace`] does the Adam7 reordering.
//! * [`compress`] hands the zlib stream to `miniz_oxide`.
//!
//! Diagnostics go through the [`log`] facade. Nothing is logged above `warn`.

extern crate alloc;

#[cfg(target_pointer_width = "16")]
compile_error!("this crate assumes 32-bit or bigger pointers!");

mod error;
pub use error::*;

pub mod chunk;
pub mod compress;
pub mod config;
pub mod crc32;
pub mod filter;
pub mod header;
pub mod interlace;
pub mod parser;
pub mod transcoder;
pub mod writer;

pub use chunk::{ChunkIndex, ChunkType};
pub use config::{FilterStrategy, TranscodeConfig};
pub use filter::FilterType;
pub use header::{BitDepth, ColorType, ImageMetadata, PixelFormat};
pub use interlace::InterlaceMethod;
pub use parser::{parse_stream, ParsedStream};
pub use transcoder::{PixelBuffer, Stage, Transcoder};
