//! Horizontal run-length coding of palette indices.
//!
//! The pixel buffer is treated as one flat row: a run may continue from the
//! end of one image row into the start of the next. Runs are cut at 255.

use thiserror::Error;

use super::palette::{Palette, PaletteError};
use crate::buffer::BufferError;
use crate::constants::{MAX_RUN_LENGTH, PAIR_SIZE};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RleCompressionError {
    #[error("Invalid pixel data length: {len} is not a multiple of stride {stride}")]
    InvalidPixelDataLength { len: usize, stride: usize },
    #[error("Palette lookup failed")]
    Palette(#[from] PaletteError),
    #[error("Failed to write run")]
    Buffer(#[from] BufferError),
    #[error("Run count exceeds 32 bits")]
    TooManyRuns,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RleDecompressionError {
    #[error("Invalid pair stream length: expected multiple of 2 bytes, got {0}")]
    InvalidInputLength(usize),
    #[error("Invalid palette data length: {len} is not a multiple of stride {stride}")]
    InvalidPaletteLength { len: usize, stride: usize },
    #[error("Zero run length in pair #{pair}")]
    ZeroRunLength { pair: usize },
    #[error("Invalid palette index {index} in pair #{pair}: palette holds {len} colors")]
    InvalidPaletteIndex { pair: usize, index: u8, len: usize },
    #[error("Pair #{pair} writes past the end of the {capacity} byte destination")]
    Overrun { pair: usize, capacity: usize },
    #[error("Pair stream covers {written} bytes, destination expects {expected}")]
    Underrun { written: usize, expected: usize },
}

/// One `(run_length, palette_index)` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Run {
    pub length: u8,
    pub index: u8,
}

impl Run {
    #[inline]
    pub fn to_bytes(self) -> [u8; PAIR_SIZE] {
        [self.length, self.index]
    }

    #[inline]
    pub fn from_bytes(bytes: [u8; PAIR_SIZE]) -> Self {
        Self {
            length: bytes[0],
            index: bytes[1],
        }
    }
}

/// Iterates the pairs of a pair stream. A trailing odd byte is not yielded.
pub fn runs(pairs: &[u8]) -> impl Iterator<Item = Run> + '_ {
    pairs
        .chunks_exact(PAIR_SIZE)
        .map(|pair| Run::from_bytes([pair[0], pair[1]]))
}

/// Total number of pixels a pair stream expands to.
pub fn count_pixels(pairs: &[u8]) -> u64 {
    runs(pairs).map(|run| run.length as u64).sum()
}

/// Scans `pixels` left to right and hands each finished run to `emit`.
///
/// Every run color is resolved through [`Palette::find_or_insert`], so new
/// colors are appended in first-occurrence order. Returns the number of runs
/// emitted.
///
/// # Errors
/// - `RleCompressionError::InvalidPixelDataLength` if `pixels` is not a multiple of the stride
/// - `RleCompressionError::Palette` if a new color does not fit in the palette
/// - any error returned by `emit`
pub fn rle_compression<F>(
    pixels: &[u8],
    palette: &mut Palette,
    mut emit: F,
) -> Result<u32, RleCompressionError>
where
    F: FnMut(Run) -> Result<(), RleCompressionError>,
{
    let stride = palette.stride();
    if pixels.len() % stride != 0 {
        return Err(RleCompressionError::InvalidPixelDataLength {
            len: pixels.len(),
            stride,
        });
    }

    let mut pixels = pixels.chunks_exact(stride);
    let Some(first) = pixels.next() else {
        return Ok(0);
    };

    let mut run_color = first;
    let mut run_length = 1u8;
    let mut count = 0u32;

    let mut flush = |color: &[u8], length: u8, count: &mut u32| {
        let index = palette.find_or_insert(color)?;
        emit(Run { length, index })?;
        *count = count
            .checked_add(1)
            .ok_or(RleCompressionError::TooManyRuns)?;
        Ok::<(), RleCompressionError>(())
    };

    for pixel in pixels {
        if pixel == run_color && run_length < MAX_RUN_LENGTH {
            run_length += 1;
            continue;
        }

        flush(run_color, run_length, &mut count)?;
        run_color = pixel;
        run_length = 1;
    }

    flush(run_color, run_length, &mut count)?;

    Ok(count)
}

/// Replays a pair stream against palette bytes into `dest`.
///
/// `dest` must be exactly the size of the decoded image; the cursor runs
/// linearly across row boundaries. Returns the number of bytes written.
///
/// # Errors
/// Any structural fault of the pair stream. Bytes of `dest` before the faulty
/// pair have already been written; validate the stream first when it is untrusted.
pub fn rle_decompression(
    pairs: &[u8],
    palette: &[u8],
    stride: usize,
    dest: &mut [u8],
) -> Result<usize, RleDecompressionError> {
    if pairs.len() % PAIR_SIZE != 0 {
        return Err(RleDecompressionError::InvalidInputLength(pairs.len()));
    }
    if palette.len() % stride != 0 {
        return Err(RleDecompressionError::InvalidPaletteLength {
            len: palette.len(),
            stride,
        });
    }

    let palette_len = palette.len() / stride;
    let mut cursor = 0;

    for (pair, run) in runs(pairs).enumerate() {
        if run.length == 0 {
            return Err(RleDecompressionError::ZeroRunLength { pair });
        }

        let start = run.index as usize * stride;
        let Some(color) = palette.get(start..start + stride) else {
            return Err(RleDecompressionError::InvalidPaletteIndex {
                pair,
                index: run.index,
                len: palette_len,
            });
        };

        let run_bytes = run.length as usize * stride;
        if run_bytes > dest.len() - cursor {
            return Err(RleDecompressionError::Overrun {
                pair,
                capacity: dest.len(),
            });
        }
        let end = cursor + run_bytes;

        for slot in dest[cursor..end].chunks_exact_mut(stride) {
            slot.copy_from_slice(color);
        }
        cursor = end;
    }

    if cursor != dest.len() {
        return Err(RleDecompressionError::Underrun {
            written: cursor,
            expected: dest.len(),
        });
    }

    Ok(cursor)
}
