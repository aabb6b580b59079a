use std::collections::HashMap;

use thiserror::Error;

use crate::constants::MAX_PALETTE_COLORS;
use crate::image::format::PixelFormat;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PaletteError {
    #[error("Palette overflow: maximum 256 colors supported, attempted to add color #{0}")]
    TooManyColors(usize),
    #[error("Invalid color length: expected {expected} bytes, got {actual}")]
    InvalidColorLength { expected: usize, actual: usize },
    #[error("Invalid palette data length: {len} is not a multiple of stride {stride}")]
    InvalidDataLength { len: usize, stride: usize },
    #[error("Duplicate color {color:02X?} at palette index {index}")]
    DuplicateColor { index: usize, color: Vec<u8> },
    #[error("Color {0:02X?} is not in the palette")]
    ColorNotInPalette(Vec<u8>),
}

/// Insertion-ordered, deduplicated table of up to 256 colors.
///
/// Colors are stored back to back with the stride of the palette format, in
/// the order they were first inserted. That order is the byte layout of an
/// embedded palette.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Palette {
    format: PixelFormat,
    colors: Vec<u8>,
    lookup: HashMap<[u8; 4], u8>,
}

/// Lookup key; RGB colors keep a zero fourth byte, which never collides
/// because all entries of one palette share a stride.
fn key(color: &[u8]) -> [u8; 4] {
    let mut key = [0; 4];
    key[..color.len()].copy_from_slice(color);
    key
}

impl Palette {
    pub fn new(format: PixelFormat) -> Self {
        Self {
            format,
            colors: Vec::with_capacity(MAX_PALETTE_COLORS * format.stride()),
            lookup: HashMap::new(),
        }
    }

    /// Builds a palette from raw color bytes (R, G, B[, A], R, G, B[, A], ...).
    ///
    /// # Errors
    /// - `PaletteError::InvalidDataLength` if `bytes` is not a multiple of the stride
    /// - `PaletteError::TooManyColors` if it holds more than 256 colors
    /// - `PaletteError::DuplicateColor` if a color appears twice
    pub fn from_bytes(format: PixelFormat, bytes: &[u8]) -> Result<Self, PaletteError> {
        let stride = format.stride();
        if bytes.len() % stride != 0 {
            return Err(PaletteError::InvalidDataLength {
                len: bytes.len(),
                stride,
            });
        }

        let mut palette = Self::new(format);
        for (index, color) in bytes.chunks_exact(stride).enumerate() {
            if palette.find(color).is_some() {
                return Err(PaletteError::DuplicateColor {
                    index,
                    color: color.to_vec(),
                });
            }
            palette.find_or_insert(color)?;
        }

        Ok(palette)
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.format.stride()
    }

    /// Number of colors.
    #[inline]
    pub fn len(&self) -> usize {
        self.colors.len() / self.stride()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Raw color bytes in insertion order.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.colors
    }

    pub fn colors(&self) -> impl Iterator<Item = &[u8]> {
        self.colors.chunks_exact(self.stride())
    }

    pub fn get(&self, index: u8) -> Option<&[u8]> {
        let stride = self.stride();
        let start = index as usize * stride;
        self.colors.get(start..start + stride)
    }

    /// Index of an exact byte match, if present.
    pub fn find(&self, color: &[u8]) -> Option<u8> {
        if color.len() != self.stride() {
            return None;
        }
        self.lookup.get(&key(color)).copied()
    }

    /// Returns the index of `color`, appending it first if it is new.
    ///
    /// # Errors
    /// - `PaletteError::InvalidColorLength` if `color` is not exactly one stride long
    /// - `PaletteError::TooManyColors` if the palette already holds 256 colors
    pub fn find_or_insert(&mut self, color: &[u8]) -> Result<u8, PaletteError> {
        if color.len() != self.stride() {
            return Err(PaletteError::InvalidColorLength {
                expected: self.stride(),
                actual: color.len(),
            });
        }

        if let Some(index) = self.find(color) {
            return Ok(index);
        }

        let len = self.len();
        if len >= MAX_PALETTE_COLORS {
            return Err(PaletteError::TooManyColors(len + 1));
        }

        let index = len as u8;
        self.colors.extend_from_slice(color);
        self.lookup.insert(key(color), index);
        Ok(index)
    }

    /// Inserts every color of a pixel buffer in first-occurrence order.
    ///
    /// Trailing bytes that do not fill a whole pixel are ignored; callers check
    /// the buffer length against the image size beforehand.
    pub fn extend_from_pixels(&mut self, pixels: &[u8]) -> Result<(), PaletteError> {
        for pixel in pixels.chunks_exact(self.stride()) {
            self.find_or_insert(pixel)?;
        }
        Ok(())
    }

    /// Checks that every pixel of a buffer is already in the palette.
    pub fn covers(&self, pixels: &[u8]) -> Result<(), PaletteError> {
        match pixels
            .chunks_exact(self.stride())
            .find(|pixel| self.find(pixel).is_none())
        {
            Some(pixel) => Err(PaletteError::ColorNotInPalette(pixel.to_vec())),
            None => Ok(()),
        }
    }
}
