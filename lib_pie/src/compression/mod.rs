pub mod palette;
pub mod rle;

pub use palette::{Palette, PaletteError};
pub use rle::{
    count_pixels, rle_compression, rle_decompression, runs, Run, RleCompressionError,
    RleDecompressionError,
};
