use log::{debug, error, info};
use thiserror::Error;

use super::format::{Header, HeaderError, Image, PixelFormat};
use super::validate::{check_layout, check_pairs, StreamLayout, ValidationError};
use crate::compression::palette::Palette;
use crate::compression::rle::{count_pixels, rle_decompression, RleDecompressionError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Invalid header")]
    InvalidHeader(#[from] HeaderError),
    #[error("Invalid stream")]
    InvalidStream(#[from] ValidationError),
    #[error("Destination buffer of {capacity} bytes is too small, {needed} bytes required")]
    DestinationTooSmall { capacity: usize, needed: usize },
    #[error("Stream has no embedded palette and none was supplied")]
    MissingPalette,
    #[error("Palette format {palette:?} does not match image format {image:?}")]
    PaletteFormatMismatch {
        palette: PixelFormat,
        image: PixelFormat,
    },
    #[error("Decompression failed")]
    DecompressionFailed(#[from] RleDecompressionError),
}

/// What a successful decode produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedInfo {
    pub width: u16,
    pub height: u16,
    pub format: PixelFormat,
    pub bytes_written: usize,
}

impl DecodedInfo {
    #[inline]
    pub fn stride(&self) -> usize {
        self.format.stride()
    }
}

/// Size of the pixel buffer `source` decodes to, from the header alone.
///
/// # Errors
/// `HeaderError::InvalidDimensions` if that size does not fit in `usize`.
pub fn required_decoded_size(source: &[u8]) -> Result<usize, HeaderError> {
    let header = Header::parse(source)?;
    header.decoded_size().ok_or(HeaderError::InvalidDimensions {
        width: header.width,
        height: header.height,
    })
}

/// Decodes `source` into `dest` using the palette embedded in the stream.
///
/// # Errors
/// - `DecodeError::MissingPalette` if the stream was written without a palette
/// - `DecodeError::DestinationTooSmall` if `dest` is shorter than
///   [`required_decoded_size`]; nothing is written
/// - header and validation errors for malformed streams
pub fn decode(source: &[u8], dest: &mut [u8]) -> Result<DecodedInfo, DecodeError> {
    info!("Starting decoding");
    let (header, layout) = read_layout(source)?;
    decode_validated(source, &header, &layout, None, dest)
}

/// Decodes `source` into `dest` with an externally supplied palette.
///
/// The external palette is used even if the stream embeds one.
pub fn decode_with_palette(
    source: &[u8],
    palette: &Palette,
    dest: &mut [u8],
) -> Result<DecodedInfo, DecodeError> {
    info!("Starting decoding with external palette");
    let (header, layout) = read_layout(source)?;
    decode_validated(source, &header, &layout, Some(palette), dest)
}

/// Decodes into a freshly allocated [`Image`].
///
/// The pair stream must account for every pixel before the buffer is
/// allocated, so a forged header cannot request more memory than the runs
/// in `source` can fill.
pub fn decode_to_vec(source: &[u8], palette: Option<&Palette>) -> Result<Image, DecodeError> {
    info!("Starting decoding into a new buffer");
    let (header, layout) = read_layout(source)?;

    let expected = header.pixel_count() as u64;
    let covered = count_pixels(&source[layout.pairs.clone()]);
    if covered != expected {
        error!("Pair stream covers {} pixels, image has {}", covered, expected);
        return Err(ValidationError::PixelCountMismatch {
            expected,
            actual: covered,
        }
        .into());
    }

    let mut pixels = vec![0; layout.decoded_size];
    let info = decode_validated(source, &header, &layout, palette, &mut pixels)?;

    Ok(Image::new(info.width, info.height, info.format, pixels))
}

/// Parses the header and checks that the sections it announces fit in `source`.
fn read_layout(source: &[u8]) -> Result<(Header, StreamLayout), DecodeError> {
    let header = Header::parse(source).map_err(|err| {
        error!("Invalid header: {}", err);
        DecodeError::from(err)
    })?;
    debug!(
        "Header read: {}x{}, flags {:#x}, {} pairs",
        header.width, header.height, header.flags, header.pair_count
    );

    let layout = check_layout(&header, source.len()).map_err(|err| {
        error!("Invalid stream layout: {}", err);
        DecodeError::from(err)
    })?;

    Ok((header, layout))
}

fn decode_validated(
    source: &[u8],
    header: &Header,
    layout: &StreamLayout,
    external: Option<&Palette>,
    dest: &mut [u8],
) -> Result<DecodedInfo, DecodeError> {
    let needed = layout.decoded_size;
    if dest.len() < needed {
        error!(
            "Destination buffer of {} bytes is too small, {} bytes required",
            dest.len(),
            needed
        );
        return Err(DecodeError::DestinationTooSmall {
            capacity: dest.len(),
            needed,
        });
    }

    let format = header.format();
    let palette = match (external, &layout.palette) {
        (Some(palette), _) => {
            if palette.format() != format {
                error!(
                    "Palette format {:?} does not match image format {:?}",
                    palette.format(),
                    format
                );
                return Err(DecodeError::PaletteFormatMismatch {
                    palette: palette.format(),
                    image: format,
                });
            }
            debug!("Using external palette with {} colors", palette.len());
            palette.as_bytes()
        }
        (None, Some(range)) => {
            debug!(
                "Using embedded palette with {} colors",
                layout.palette_len(header.stride())
            );
            &source[range.clone()]
        }
        (None, None) => {
            error!("Stream has no embedded palette and none was supplied");
            return Err(DecodeError::MissingPalette);
        }
    };

    let pairs = &source[layout.pairs.clone()];
    check_pairs(pairs, palette.len() / header.stride(), header.pixel_count()).map_err(|err| {
        error!("Invalid pair stream: {}", err);
        DecodeError::from(err)
    })?;

    let bytes_written = rle_decompression(pairs, palette, header.stride(), &mut dest[..needed])?;
    info!(
        "Decoding completed: {}x{}, {} bytes",
        header.width, header.height, bytes_written
    );

    Ok(DecodedInfo {
        width: header.width,
        height: header.height,
        format,
        bytes_written,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HEADER_SIZE;

    // 3x2 RGB, pairs (4, 0) (2, 1), embedded two color palette.
    const STREAM: [u8; HEADER_SIZE + 4 + 6] = [
        b'P', b'I', b'E', 2, 1, 0, 0, 0, 3, 0, 2, 0, 2, 0, 0, 0, //
        4, 0, 2, 1, //
        0x11, 0x22, 0x33, 0xAA, 0xBB, 0xCC,
    ];

    #[test]
    fn test_decode_embedded() {
        let mut dest = [0u8; 18];
        let info = decode(&STREAM, &mut dest).unwrap();
        assert_eq!(info.width, 3);
        assert_eq!(info.height, 2);
        assert_eq!(info.stride(), 3);
        assert_eq!(info.bytes_written, 18);
        assert_eq!(&dest[..12], [0x11, 0x22, 0x33].repeat(4).as_slice());
        assert_eq!(&dest[12..], [0xAA, 0xBB, 0xCC].repeat(2).as_slice());
    }

    #[test]
    fn test_decode_larger_destination_keeps_tail() {
        let mut dest = [0xFFu8; 20];
        let info = decode(&STREAM, &mut dest).unwrap();
        assert_eq!(info.bytes_written, 18);
        assert_eq!(&dest[18..], &[0xFF, 0xFF]);
    }

    #[test]
    fn test_decode_destination_too_small() {
        let mut dest = [0x5Au8; 17];
        assert!(matches!(
            decode(&STREAM, &mut dest),
            Err(DecodeError::DestinationTooSmall {
                capacity: 17,
                needed: 18
            })
        ));
        assert!(dest.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_required_decoded_size() {
        assert_eq!(required_decoded_size(&STREAM).unwrap(), 18);
        assert!(matches!(
            required_decoded_size(&STREAM[..4]),
            Err(HeaderError::Truncated(4))
        ));
    }

    #[test]
    fn test_decode_missing_palette() {
        let mut stream = STREAM;
        stream[4] = 0;
        let mut dest = [0u8; 18];
        assert!(matches!(
            decode(&stream, &mut dest),
            Err(DecodeError::MissingPalette)
        ));

        let palette = Palette::from_bytes(PixelFormat::Rgb, &[1, 1, 1, 2, 2, 2]).unwrap();
        decode_with_palette(&stream, &palette, &mut dest).unwrap();
        assert_eq!(&dest[..3], &[1, 1, 1]);
        assert_eq!(&dest[15..], &[2, 2, 2]);
    }

    #[test]
    fn test_decode_palette_format_mismatch() {
        let palette = Palette::from_bytes(PixelFormat::Rgba, &[1, 1, 1, 1]).unwrap();
        let mut dest = [0u8; 18];
        assert!(matches!(
            decode_with_palette(&STREAM, &palette, &mut dest),
            Err(DecodeError::PaletteFormatMismatch {
                palette: PixelFormat::Rgba,
                image: PixelFormat::Rgb
            })
        ));
    }

    #[test]
    fn test_decode_huge_pair_count() {
        let mut stream = STREAM;
        stream[12..16].copy_from_slice(&u32::MAX.to_le_bytes());
        let mut dest = [0x5Au8; 18];
        assert!(matches!(
            decode(&stream, &mut dest),
            Err(DecodeError::InvalidStream(ValidationError::Truncated { .. }))
        ));
        assert!(matches!(
            decode_to_vec(&stream, None),
            Err(DecodeError::InvalidStream(ValidationError::Truncated { .. }))
        ));
        assert!(dest.iter().all(|&b| b == 0x5A));
    }

    #[test]
    fn test_decode_to_vec() {
        let image = decode_to_vec(&STREAM, None).unwrap();
        assert_eq!(image.format, PixelFormat::Rgb);
        assert_eq!(image.pixels.len(), 18);
        assert_eq!(image.stride(), 3);
    }
}
