use log::{debug, error, info};
use thiserror::Error;

use super::format::{Header, PixelFormat};
use crate::buffer::{BufferError, ByteWriter};
use crate::compression::palette::{Palette, PaletteError};
use crate::compression::rle::{rle_compression, RleCompressionError};
use crate::constants::{HEADER_SIZE, MAX_PALETTE_COLORS, PAIR_COUNT_OFFSET, PAIR_SIZE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EncodingError {
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },
    #[error("Image of {width}x{height} does not fit in addressable memory")]
    ImageTooLarge { width: u16, height: u16 },
    #[error("Pixel buffer holds {actual} bytes, expected {expected} for the image size")]
    PixelCountMismatch { expected: usize, actual: usize },
    #[error("Palette size exceeds 256 colors")]
    TooManyColors,
    #[error("Color {0:02X?} is not in the supplied palette")]
    ColorNotInPalette(Vec<u8>),
    #[error("Palette format {palette:?} does not match pixel format {pixels:?}")]
    PaletteFormatMismatch {
        palette: PixelFormat,
        pixels: PixelFormat,
    },
    #[error("Output buffer of {capacity} bytes is too small, at least {needed} bytes required")]
    OutputTooLarge { capacity: usize, needed: usize },
    #[error("Run count exceeds 32 bits")]
    TooManyPairs,
    #[error("Failed to compress image data")]
    CompressionFailed(#[source] RleCompressionError),
}

impl From<BufferError> for EncodingError {
    fn from(err: BufferError) -> Self {
        match err {
            BufferError::Overflow {
                offset,
                needed,
                capacity,
            } => EncodingError::OutputTooLarge {
                capacity,
                needed: offset + needed,
            },
            BufferError::PatchOutOfRange { .. } => {
                EncodingError::CompressionFailed(RleCompressionError::Buffer(err))
            }
        }
    }
}

impl From<PaletteError> for EncodingError {
    fn from(err: PaletteError) -> Self {
        match err {
            PaletteError::TooManyColors(_) => EncodingError::TooManyColors,
            PaletteError::ColorNotInPalette(color) => EncodingError::ColorNotInPalette(color),
            other => EncodingError::CompressionFailed(RleCompressionError::Palette(other)),
        }
    }
}

impl From<RleCompressionError> for EncodingError {
    fn from(err: RleCompressionError) -> Self {
        match err {
            RleCompressionError::Palette(err) => err.into(),
            RleCompressionError::Buffer(err) => err.into(),
            RleCompressionError::TooManyRuns => EncodingError::TooManyPairs,
            other => EncodingError::CompressionFailed(other),
        }
    }
}

/// Encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    /// Layout of the input pixels; RGBA sets the alpha flag.
    pub format: PixelFormat,
    /// Append the palette after the pair stream.
    pub embed_palette: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            format: PixelFormat::Rgba,
            embed_palette: true,
        }
    }
}

/// Worst-case encoded size: one pair per pixel plus a full palette.
///
/// `None` if that size does not fit in `usize`.
pub fn max_encoded_size(
    width: u16,
    height: u16,
    format: PixelFormat,
    embed_palette: bool,
) -> Option<usize> {
    let pixel_count = width as usize * height as usize;
    let palette = if embed_palette {
        MAX_PALETTE_COLORS * format.stride()
    } else {
        0
    };
    pixel_count
        .checked_mul(PAIR_SIZE)?
        .checked_add(HEADER_SIZE + palette)
}

/// Encodes `pixels` into `dest`, building the palette from the image itself.
///
/// Palette entries are numbered in first-occurrence order of a left to right,
/// top to bottom scan. Returns the number of bytes written.
///
/// # Errors
/// - `EncodingError::TooManyColors` if the image has more than 256 colors; `dest` is untouched
/// - `EncodingError::OutputTooLarge` if `dest` runs out; the written prefix is zeroed
pub fn encode(
    pixels: &[u8],
    width: u16,
    height: u16,
    options: &EncodeOptions,
    dest: &mut [u8],
) -> Result<usize, EncodingError> {
    info!("Starting encoding");
    check_input(pixels, width, height, options.format)?;

    // Step 1: Resolve every color before anything is written
    let mut palette = Palette::new(options.format);
    palette.extend_from_pixels(pixels).map_err(|err| {
        error!("Palette construction failed: {}", err);
        EncodingError::from(err)
    })?;
    debug!("Palette built with {} colors", palette.len());

    write_stream(pixels, width, height, options, &mut palette, dest)
}

/// Encodes `pixels` into `dest` against a fixed, caller-supplied palette.
///
/// Indices refer to `palette` as given, so a decoder holding the same palette
/// out of band can decode the stream without an embedded copy.
///
/// # Errors
/// As [`encode`], plus `EncodingError::ColorNotInPalette` for a pixel the
/// palette does not contain and `EncodingError::PaletteFormatMismatch`.
pub fn encode_with_palette(
    pixels: &[u8],
    width: u16,
    height: u16,
    options: &EncodeOptions,
    palette: &Palette,
    dest: &mut [u8],
) -> Result<usize, EncodingError> {
    info!("Starting encoding with external palette");
    check_input(pixels, width, height, options.format)?;

    if palette.format() != options.format {
        error!(
            "Palette format {:?} does not match pixel format {:?}",
            palette.format(),
            options.format
        );
        return Err(EncodingError::PaletteFormatMismatch {
            palette: palette.format(),
            pixels: options.format,
        });
    }

    // Step 1: Every color must already be known
    palette.covers(pixels).map_err(|err| {
        error!("{}", err);
        EncodingError::from(err)
    })?;
    debug!("External palette covers image with {} colors", palette.len());

    let mut palette = palette.clone();
    write_stream(pixels, width, height, options, &mut palette, dest)
}

/// Encodes into a freshly allocated buffer trimmed to the encoded size.
pub fn encode_to_vec(
    pixels: &[u8],
    width: u16,
    height: u16,
    options: &EncodeOptions,
) -> Result<Vec<u8>, EncodingError> {
    let capacity = max_encoded_size(width, height, options.format, options.embed_palette)
        .ok_or(EncodingError::ImageTooLarge { width, height })?;
    let mut encoded = vec![0; capacity];
    let len = encode(pixels, width, height, options, &mut encoded)?;
    encoded.truncate(len);
    Ok(encoded)
}

fn check_input(
    pixels: &[u8],
    width: u16,
    height: u16,
    format: PixelFormat,
) -> Result<(), EncodingError> {
    if width == 0 || height == 0 {
        error!("Invalid image dimensions {}x{}", width, height);
        return Err(EncodingError::InvalidDimensions { width, height });
    }

    let pixel_count = width as usize * height as usize;
    let Some(expected) = pixel_count.checked_mul(format.stride()) else {
        error!("Image of {}x{} does not fit in addressable memory", width, height);
        return Err(EncodingError::ImageTooLarge { width, height });
    };
    if pixels.len() != expected {
        error!(
            "Pixel buffer holds {} bytes, expected {}",
            pixels.len(),
            expected
        );
        return Err(EncodingError::PixelCountMismatch {
            expected,
            actual: pixels.len(),
        });
    }

    Ok(())
}

/// Writes header, pairs and optional palette. On failure the destination
/// prefix written so far is zeroed.
fn write_stream(
    pixels: &[u8],
    width: u16,
    height: u16,
    options: &EncodeOptions,
    palette: &mut Palette,
    dest: &mut [u8],
) -> Result<usize, EncodingError> {
    let mut writer = ByteWriter::new(dest);

    match write_sections(pixels, width, height, options, palette, &mut writer) {
        Ok(pair_count) => {
            let written = writer.finish();
            info!(
                "Encoding completed: {} pairs, {} bytes ({:.2}% of raw)",
                pair_count,
                written,
                written as f32 / pixels.len() as f32 * 100.0
            );
            Ok(written)
        }
        Err(err) => {
            error!(
                "Encoding failed after {} of {} bytes: {}",
                writer.position(),
                writer.capacity(),
                err
            );
            writer.discard();
            Err(err)
        }
    }
}

fn write_sections(
    pixels: &[u8],
    width: u16,
    height: u16,
    options: &EncodeOptions,
    palette: &mut Palette,
    writer: &mut ByteWriter,
) -> Result<u32, EncodingError> {
    // Step 2: Write header with a placeholder pair count
    let header = Header::new(width, height, options.format, options.embed_palette);
    header.write(writer)?;
    debug!(
        "Header written: {}x{}, flags {:#x}",
        header.width, header.height, header.flags
    );

    // Step 3: Run-length encode the palette indices
    let pair_count = rle_compression(pixels, palette, |run| {
        writer.write_bytes(&run.to_bytes())?;
        Ok(())
    })?;
    writer.patch_u32_le(PAIR_COUNT_OFFSET, pair_count)?;
    debug!("Pair stream written with {} pairs", pair_count);

    // Step 4: Append the palette
    if options.embed_palette {
        writer.write_bytes(palette.as_bytes())?;
        debug!("Palette data written with {} colors", palette.len());
    }

    Ok(pair_count)
}
