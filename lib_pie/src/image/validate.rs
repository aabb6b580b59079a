//! Structural checks for streams from untrusted sources.
//!
//! The decoder runs these before touching the destination buffer.

use std::ops::Range;

use log::debug;
use thiserror::Error;

use super::format::Header;
use crate::compression::rle::runs;
use crate::constants::{FLAGS_MASK, HEADER_SIZE, MAX_PALETTE_COLORS, VERSION};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Unsupported format version {0}")]
    InvalidVersion(u8),
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },
    #[error("Reserved flag bits set: {0:#010x}")]
    InvalidFlags(u32),
    #[error("Pair stream is empty")]
    EmptyPairStream,
    #[error("Stream truncated: layout needs {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },
    #[error("Embedded palette of {len} bytes is not 1..=256 colors of stride {stride}")]
    InvalidPaletteLength { len: usize, stride: usize },
    #[error("Zero run length in pair #{pair}")]
    ZeroRunLength { pair: usize },
    #[error("Palette index {index} in pair #{pair} exceeds palette size of {len}")]
    InvalidPaletteIndex { pair: usize, index: u8, len: usize },
    #[error("Pair stream covers {actual} pixels, image has {expected}")]
    PixelCountMismatch { expected: u64, actual: u64 },
}

/// Where the sections of a stream live, as byte ranges into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamLayout {
    pub pairs: Range<usize>,
    /// Present only when the palette flag is set.
    pub palette: Option<Range<usize>>,
    /// Size of the pixel buffer the stream decodes to.
    pub decoded_size: usize,
}

impl StreamLayout {
    /// Number of colors in the embedded palette, zero when there is none.
    pub fn palette_len(&self, stride: usize) -> usize {
        self.palette.as_ref().map_or(0, |range| range.len() / stride)
    }
}

/// Header-level sanity check against the number of bytes available.
pub fn validate(header: &Header, available: usize) -> bool {
    check_layout(header, available).is_ok()
}

/// Checks the header fields and that the sections it announces fit in `available` bytes.
///
/// An embedded palette takes every byte after the pair stream, so it must be
/// a whole number of colors, at least one and at most 256. Sizes that do not
/// fit in `usize` are reported as errors, never wrapped.
pub fn check_layout(header: &Header, available: usize) -> Result<StreamLayout, ValidationError> {
    if header.version != VERSION {
        return Err(ValidationError::InvalidVersion(header.version));
    }
    if header.width == 0 || header.height == 0 {
        return Err(ValidationError::InvalidDimensions {
            width: header.width,
            height: header.height,
        });
    }
    if header.flags & !FLAGS_MASK != 0 {
        return Err(ValidationError::InvalidFlags(header.flags));
    }
    if header.pair_count == 0 {
        return Err(ValidationError::EmptyPairStream);
    }

    let Some(decoded_size) = header.decoded_size() else {
        return Err(ValidationError::InvalidDimensions {
            width: header.width,
            height: header.height,
        });
    };

    let stride = header.stride();
    let palette_minimum = if header.has_embedded_palette() {
        stride
    } else {
        0
    };
    let pairs_end = header
        .pairs_len()
        .and_then(|len| len.checked_add(HEADER_SIZE));
    let minimum = pairs_end.and_then(|end| end.checked_add(palette_minimum));
    let (Some(pairs_end), Some(minimum)) = (pairs_end, minimum) else {
        return Err(ValidationError::Truncated {
            needed: usize::MAX,
            available,
        });
    };
    if minimum > available {
        return Err(ValidationError::Truncated {
            needed: minimum,
            available,
        });
    }

    let pairs = HEADER_SIZE..pairs_end;

    let palette = if header.has_embedded_palette() {
        let len = available - pairs.end;
        if len % stride != 0 || len / stride > MAX_PALETTE_COLORS {
            return Err(ValidationError::InvalidPaletteLength { len, stride });
        }
        Some(pairs.end..available)
    } else {
        None
    };

    debug!("Stream layout valid: pairs {:?}, palette {:?}", pairs, palette);

    Ok(StreamLayout {
        pairs,
        palette,
        decoded_size,
    })
}

/// Checks every pair against the palette and that the runs sum to `pixel_count`.
pub fn check_pairs(
    pairs: &[u8],
    palette_len: usize,
    pixel_count: usize,
) -> Result<(), ValidationError> {
    let mut total = 0u64;

    for (pair, run) in runs(pairs).enumerate() {
        if run.length == 0 {
            return Err(ValidationError::ZeroRunLength { pair });
        }
        if run.index as usize >= palette_len {
            return Err(ValidationError::InvalidPaletteIndex {
                pair,
                index: run.index,
                len: palette_len,
            });
        }
        total += run.length as u64;
    }

    if total != pixel_count as u64 {
        return Err(ValidationError::PixelCountMismatch {
            expected: pixel_count as u64,
            actual: total,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::format::PixelFormat;

    fn header(pair_count: u32, embed: bool) -> Header {
        let mut header = Header::new(4, 2, PixelFormat::Rgb, embed);
        header.pair_count = pair_count;
        header
    }

    #[test]
    fn test_layout_with_embedded_palette() {
        let layout = check_layout(&header(3, true), 16 + 6 + 9).unwrap();
        assert_eq!(layout.pairs, 16..22);
        assert_eq!(layout.palette, Some(22..31));
        assert_eq!(layout.palette_len(3), 3);
        assert_eq!(layout.decoded_size, 4 * 2 * 3);
    }

    #[test]
    fn test_layout_without_palette_ignores_trailing_bytes() {
        let layout = check_layout(&header(3, false), 40).unwrap();
        assert_eq!(layout.pairs, 16..22);
        assert_eq!(layout.palette, None);
        assert_eq!(layout.palette_len(3), 0);
    }

    #[test]
    fn test_validate_bool() {
        assert!(validate(&header(1, false), 18));
        assert!(!validate(&header(1, false), 17));
        assert!(!validate(&header(0, false), 100));
    }

    #[test]
    fn test_layout_errors() {
        let mut bad = header(1, false);
        bad.flags |= 0x10;
        assert!(matches!(
            check_layout(&bad, 100),
            Err(ValidationError::InvalidFlags(0x10))
        ));

        let mut bad = header(1, false);
        bad.version = 1;
        assert!(matches!(
            check_layout(&bad, 100),
            Err(ValidationError::InvalidVersion(1))
        ));

        let mut bad = header(1, false);
        bad.width = 0;
        assert!(matches!(
            check_layout(&bad, 100),
            Err(ValidationError::InvalidDimensions { width: 0, .. })
        ));

        assert!(matches!(
            check_layout(&header(0, false), 100),
            Err(ValidationError::EmptyPairStream)
        ));
        assert!(matches!(
            check_layout(&header(2, true), 20),
            Err(ValidationError::Truncated {
                needed: 23,
                available: 20
            })
        ));
        assert!(matches!(
            check_layout(&header(2, true), 25),
            Err(ValidationError::InvalidPaletteLength { len: 5, stride: 3 })
        ));
        assert!(matches!(
            check_layout(&header(1, true), 18 + 257 * 3),
            Err(ValidationError::InvalidPaletteLength { .. })
        ));
    }

    #[test]
    fn test_layout_huge_pair_count() {
        for embed in [true, false] {
            assert!(matches!(
                check_layout(&header(u32::MAX, embed), 1024),
                Err(ValidationError::Truncated {
                    available: 1024,
                    ..
                })
            ));
        }
        assert!(!validate(&header(u32::MAX, true), usize::MAX));
    }

    #[test]
    fn test_layout_largest_image() {
        let mut largest = Header::new(u16::MAX, u16::MAX, PixelFormat::Rgba, false);
        largest.pair_count = 1;
        match check_layout(&largest, 18) {
            Ok(layout) => assert_eq!(layout.decoded_size as u64, 65535 * 65535 * 4),
            Err(err) => assert!(matches!(err, ValidationError::InvalidDimensions { .. })),
        }
    }

    #[test]
    fn test_check_pairs() {
        assert!(check_pairs(&[5, 0, 3, 1], 2, 8).is_ok());
        assert!(matches!(
            check_pairs(&[5, 0, 0, 1], 2, 5),
            Err(ValidationError::ZeroRunLength { pair: 1 })
        ));
        assert!(matches!(
            check_pairs(&[5, 2], 2, 5),
            Err(ValidationError::InvalidPaletteIndex {
                pair: 0,
                index: 2,
                len: 2
            })
        ));
        assert!(matches!(
            check_pairs(&[5, 0, 3, 1], 2, 9),
            Err(ValidationError::PixelCountMismatch {
                expected: 9,
                actual: 8
            })
        ));
    }
}
