//! PIE: palette indexed encoding for pixel art.
//!
//! Pixels are mapped to a palette of at most 256 colors and the index stream
//! is run-length encoded. The palette can be embedded in the stream or kept
//! by the decoder out of band.
//!
//! ```
//! use lib_pie::{decode_to_vec, encode_to_vec, EncodeOptions, PixelFormat};
//!
//! let pixels = [255, 0, 0].repeat(4);
//! let options = EncodeOptions { format: PixelFormat::Rgb, embed_palette: true };
//! let encoded = encode_to_vec(&pixels, 2, 2, &options).unwrap();
//! let image = decode_to_vec(&encoded, None).unwrap();
//! assert_eq!(image.pixels, pixels);
//! ```

pub mod buffer;
pub mod compression;
pub mod constants;
pub mod image;

use log::*;
use std::io::Write;

pub use crate::buffer::{BufferError, ByteWriter};
pub use crate::compression::{Palette, PaletteError};
pub use crate::image::decoder::{DecodeError, DecodedInfo};
pub use crate::image::encoder::{EncodeOptions, EncodingError};
pub use crate::image::format::{Header, HeaderError, Image, PixelFormat};
pub use crate::image::validate::{validate, ValidationError};
pub use crate::image::{
    decode, decode_to_vec, decode_with_palette, encode, encode_to_vec, encode_with_palette,
    max_encoded_size, required_decoded_size,
};

/// Routes `log` output of this crate to stderr. `RUST_LOG` overrides the default level.
pub fn init_logging() {
    env_logger::Builder::new()
        .target(env_logger::Target::Stderr)
        .filter(Some("lib_pie"), LevelFilter::Debug)
        .parse_default_env()
        .format(|buf, record| {
            writeln!(
                buf,
                "[{} {}:{}] {}",
                record.level(),
                record.file().unwrap_or("unknown"),
                record.line().unwrap_or(0),
                record.args()
            )
        })
        .init();
}
