//! Layout constants of the PIE byte stream.

pub const MAGIC: [u8; 3] = *b"PIE";
pub const VERSION: u8 = 2;

pub const HEADER_SIZE: usize = 16;
pub const PAIR_SIZE: usize = 2;

/// Offset of the pair-count field, patched once the run pass has finished.
pub const PAIR_COUNT_OFFSET: usize = 12;

pub const FLAG_PALETTE: u32 = 1 << 0;
pub const FLAG_ALPHA: u32 = 1 << 1;
pub const FLAGS_MASK: u32 = FLAG_PALETTE | FLAG_ALPHA;

pub const MAX_RUN_LENGTH: u8 = u8::MAX;
pub const MAX_PALETTE_COLORS: usize = 256;

pub const EXTENSION: &str = "pie";
