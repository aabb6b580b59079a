use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::buffer::{BufferError, ByteWriter};
use crate::constants::{FLAG_ALPHA, FLAG_PALETTE, HEADER_SIZE, MAGIC, PAIR_SIZE, VERSION};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HeaderError {
    #[error("Header truncated: expected 16 bytes, got {0}")]
    Truncated(usize),
    #[error("Invalid magic bytes {0:02X?}")]
    InvalidMagic([u8; 3]),
    #[error("Unsupported format version {0}")]
    UnsupportedVersion(u8),
    #[error("Invalid image dimensions: {width}x{height}")]
    InvalidDimensions { width: u16, height: u16 },
}

/// Channel layout of a pixel, and with it the palette entry stride.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PixelFormat {
    Rgb,
    #[default]
    Rgba,
}

impl PixelFormat {
    pub fn from_alpha(has_alpha: bool) -> Self {
        if has_alpha {
            PixelFormat::Rgba
        } else {
            PixelFormat::Rgb
        }
    }

    #[inline]
    pub fn stride(self) -> usize {
        match self {
            PixelFormat::Rgb => 3,
            PixelFormat::Rgba => 4,
        }
    }

    #[inline]
    pub fn has_alpha(self) -> bool {
        self == PixelFormat::Rgba
    }
}

/// The fixed 16 byte record at the start of every PIE stream.
///
/// ```text
/// offset  size  field
/// 0       3     magic "PIE"
/// 3       1     version
/// 4       4     flags       bit 0: palette embedded, bit 1: alpha
/// 8       2     width
/// 10      2     height
/// 12      4     pair count
/// ```
///
/// All numeric fields are little-endian.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: u8,
    /// Raw flags. Reserved bits are kept as read; see [`crate::image::validate`].
    pub flags: u32,
    pub width: u16,
    pub height: u16,
    pub pair_count: u32,
}

impl Header {
    /// Header for a fresh encode. The pair count starts at zero and is patched later.
    pub fn new(width: u16, height: u16, format: PixelFormat, embed_palette: bool) -> Self {
        let mut flags = 0;
        if embed_palette {
            flags |= FLAG_PALETTE;
        }
        if format.has_alpha() {
            flags |= FLAG_ALPHA;
        }

        Self {
            version: VERSION,
            flags,
            width,
            height,
            pair_count: 0,
        }
    }

    pub fn parse(bytes: &[u8]) -> Result<Self, HeaderError> {
        if bytes.len() < HEADER_SIZE {
            return Err(HeaderError::Truncated(bytes.len()));
        }

        let magic = [bytes[0], bytes[1], bytes[2]];
        if magic != MAGIC {
            return Err(HeaderError::InvalidMagic(magic));
        }

        let version = bytes[3];
        if version != VERSION {
            return Err(HeaderError::UnsupportedVersion(version));
        }

        let flags = LittleEndian::read_u32(&bytes[4..8]);
        let width = LittleEndian::read_u16(&bytes[8..10]);
        let height = LittleEndian::read_u16(&bytes[10..12]);
        let pair_count = LittleEndian::read_u32(&bytes[12..16]);

        if width == 0 || height == 0 {
            return Err(HeaderError::InvalidDimensions { width, height });
        }

        Ok(Self {
            version,
            flags,
            width,
            height,
            pair_count,
        })
    }

    pub fn write(&self, writer: &mut ByteWriter) -> Result<(), BufferError> {
        writer.write_bytes(&MAGIC)?;
        writer.write_u8(self.version)?;
        writer.write_u32_le(self.flags)?;
        writer.write_u16_le(self.width)?;
        writer.write_u16_le(self.height)?;
        writer.write_u32_le(self.pair_count)
    }

    pub fn to_bytes(&self) -> [u8; HEADER_SIZE] {
        let mut bytes = [0; HEADER_SIZE];
        bytes[..3].copy_from_slice(&MAGIC);
        bytes[3] = self.version;
        LittleEndian::write_u32(&mut bytes[4..8], self.flags);
        LittleEndian::write_u16(&mut bytes[8..10], self.width);
        LittleEndian::write_u16(&mut bytes[10..12], self.height);
        LittleEndian::write_u32(&mut bytes[12..16], self.pair_count);
        bytes
    }

    /// Bytes per pixel: 3, or 4 when the alpha flag is set.
    #[inline]
    pub fn stride(&self) -> usize {
        3 + ((self.flags & FLAG_ALPHA) >> 1) as usize
    }

    #[inline]
    pub fn format(&self) -> PixelFormat {
        PixelFormat::from_alpha(self.flags & FLAG_ALPHA != 0)
    }

    #[inline]
    pub fn has_embedded_palette(&self) -> bool {
        self.flags & FLAG_PALETTE != 0
    }

    /// At most 65535 * 65535, which fits a 32-bit `usize`.
    #[inline]
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Length of the pair stream in bytes, `None` if it does not fit in `usize`.
    #[inline]
    pub fn pairs_len(&self) -> Option<usize> {
        usize::try_from(self.pair_count)
            .ok()?
            .checked_mul(PAIR_SIZE)
    }

    /// Exact size of the decoded pixel buffer, `None` if it does not fit in `usize`.
    #[inline]
    pub fn decoded_size(&self) -> Option<usize> {
        self.pixel_count().checked_mul(self.stride())
    }
}

/// A decoded image with an owned pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Image {
    pub width: u16,
    pub height: u16,
    pub format: PixelFormat,
    pub pixels: Vec<u8>,
}

impl Image {
    pub fn new(width: u16, height: u16, format: PixelFormat, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            format,
            pixels,
        }
    }

    #[inline]
    pub fn stride(&self) -> usize {
        self.format.stride()
    }
}
